// Tests for the operation execution stage
//
// Plans are built against the mock provider so the jobs under test are the
// same deferred jobs the planner hands out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use engine::{
    Operation, OperationKind, PlanOptions, Provider, Reason, RunOptions, SyncError, SyncPlanner,
    run_operations,
};
use test_support::{Executed, MockProvider, a, b, c};

async fn plan_all_adds(target: &Arc<MockProvider>) -> Vec<Operation> {
    let origin: Arc<dyn Provider> = MockProvider::builder("./public")
        .files([a(), b(), c()])
        .build();
    let target: Arc<dyn Provider> = Arc::clone(target) as Arc<dyn Provider>;
    let mut operations = SyncPlanner::new(origin, target)
        .plan(&PlanOptions::new())
        .await
        .expect("plan");
    operations.sort_by(|left, right| left.key().cmp(right.key()));
    operations
}

#[tokio::test]
async fn empty_operation_list_is_nothing_to_do() {
    let error = run_operations(Vec::new(), &RunOptions::new())
        .await
        .expect_err("no operations");
    assert!(matches!(error, SyncError::NothingToDo));
}

#[tokio::test]
async fn every_job_runs_once() {
    let target = MockProvider::builder("./mirror").build();
    let operations = plan_all_adds(&target).await;

    let results = run_operations(operations, &RunOptions::new().concurrency(2))
        .await
        .expect("run");

    assert_eq!(results.len(), 3);
    let mut executed = target.executed();
    executed.sort_by(|left, right| left.key.cmp(&right.key));
    assert_eq!(
        executed,
        ["A.txt", "B.txt", "C.md"]
            .into_iter()
            .map(|key| Executed {
                kind: OperationKind::Copy,
                reason: Some(Reason::Add),
                key: key.to_owned(),
            })
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn progress_hooks_wrap_each_job() {
    let target = MockProvider::builder("./mirror")
        .job_delay(Duration::from_millis(5))
        .build();
    let operations = plan_all_adds(&target).await;
    let log = Arc::new(Mutex::new(Vec::new()));
    let begin_log = Arc::clone(&log);
    let end_log = Arc::clone(&log);
    let options = RunOptions::new()
        .on_begin(move |operation| {
            begin_log
                .lock()
                .expect("lock")
                .push(format!("begin {}", operation.key()));
        })
        .on_end(move |operation, result| {
            assert!(result.duration >= Duration::from_millis(5));
            end_log
                .lock()
                .expect("lock")
                .push(format!("end {}", operation.key()));
        });

    let results = run_operations(operations, &options).await.expect("run");

    assert!(results.iter().all(|result| result.duration >= Duration::from_millis(5)));
    assert_eq!(
        *log.lock().expect("lock"),
        vec![
            "begin A.txt",
            "end A.txt",
            "begin B.txt",
            "end B.txt",
            "begin C.md",
            "end C.md",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_job_fails_the_run_but_admitted_jobs_land() {
    let target = MockProvider::builder("./mirror")
        .job_delay(Duration::from_millis(30))
        .fail_job("B.txt")
        .build();
    let operations = plan_all_adds(&target).await;

    let error = run_operations(operations, &RunOptions::new().concurrency(2))
        .await
        .expect_err("B.txt fails");
    assert!(error.to_string().contains("mock failure for B.txt"));

    tokio::time::sleep(Duration::from_millis(150)).await;
    let executed: Vec<String> = target.executed().into_iter().map(|run| run.key).collect();
    assert_eq!(executed, vec!["A.txt".to_owned()]);
}

#[tokio::test]
async fn previewed_plan_is_inert_until_run() {
    let target = MockProvider::builder("./mirror").build();
    let operations = plan_all_adds(&target).await;

    let preview: Vec<_> = operations
        .iter()
        .map(|op| serde_json::to_value(op).expect("serialize"))
        .collect();

    assert_eq!(preview.len(), 3);
    assert_eq!(preview[0]["kind"], "COPY");
    assert_eq!(preview[0]["params"]["root"], "./mirror");
    assert!(target.executed().is_empty());
}
