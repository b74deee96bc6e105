//! End-to-end evaluation cycles through the kernel, using the thread pool and
//! a stub catalog so no network or worker binary is needed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jobsh_kernel::jobs::RegistryError;
use jobsh_kernel::{
    Catalog, Kernel, KernelConfig, KernelError, Reply, STILL_WAITING, UnitError, WorkerCommand,
};

/// Ids with special behaviour:
/// - 0 fails the lookup
/// - 666 panics
/// - 999 never answers
struct StubCatalog;

#[async_trait]
impl Catalog for StubCatalog {
    async fn name(&self, id: u64) -> Result<String, UnitError> {
        match id {
            0 => Err(UnitError::Lookup("not found".into())),
            666 => panic!("catalog exploded"),
            999 => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".into())
            }
            _ => Ok(format!("entry-{id}")),
        }
    }
}

fn kernel() -> Kernel {
    let config = KernelConfig::threaded().with_dex_multi_pause(Duration::ZERO);
    Kernel::with_catalog(config, Arc::new(StubCatalog)).expect("kernel")
}

fn output(kernel: &mut Kernel, line: &str) -> String {
    match kernel.execute(line) {
        Ok(Reply::Output(text)) => text,
        other => panic!("expected output for {line:?}, got {other:?}"),
    }
}

fn submit(kernel: &mut Kernel, line: &str) -> usize {
    match kernel.execute(line) {
        Ok(Reply::Submitted(index)) => index,
        other => panic!("expected submission for {line:?}, got {other:?}"),
    }
}

/// Poll `job <index>` until it stops reporting "Still waiting".
async fn wait_for(kernel: &Kernel, index: usize) -> String {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let status = kernel.registry().status(index).expect("index in range");
        if status != STILL_WAITING {
            return status;
        }
        assert!(Instant::now() < deadline, "job {index} never finished");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn wait_stopped(kernel: &Kernel) {
    tokio::time::timeout(Duration::from_secs(10), kernel.shutdown().stopped())
        .await
        .expect("shutdown should finish");
}

#[tokio::test]
async fn fib_waits_then_reports() {
    let mut kernel = kernel();
    assert_eq!(submit(&mut kernel, "fib 5"), 1);
    assert_eq!(output(&mut kernel, "job 1"), STILL_WAITING);
    assert_eq!(wait_for(&kernel, 1).await, "The 5th fibonacci number is 3");
    assert_eq!(output(&mut kernel, "job 1"), "The 5th fibonacci number is 3");
}

#[tokio::test]
async fn indices_follow_submission_order() {
    let mut kernel = kernel();
    assert_eq!(submit(&mut kernel, "fib 1"), 1);
    assert_eq!(submit(&mut kernel, "dex 3"), 2);
    assert_eq!(submit(&mut kernel, "fib-multi 2"), 3);

    let job = kernel.registry().get(2).expect("job 2");
    assert_eq!(job.label, "dex 3");
}

#[tokio::test]
async fn indices_ignore_completion_order() {
    let mut kernel = kernel();
    assert_eq!(submit(&mut kernel, "dex 999"), 1);
    assert_eq!(submit(&mut kernel, "fib 1"), 2);

    assert_eq!(wait_for(&kernel, 2).await, "The 1st fibonacci number is 0");
    assert_eq!(output(&mut kernel, "job 1"), STILL_WAITING);

    let dash = output(&mut kernel, "dash");
    let rows: Vec<&str> = dash.lines().skip(2).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("1\tdex 999 "), "{dash}");
    assert!(rows[0].ends_with("\tFalse\t"), "{dash}");
    assert!(rows[1].starts_with("2\tfib 1 "), "{dash}");
    assert!(rows[1].contains("\tTrue\t"), "{dash}");
}

#[tokio::test]
async fn label_is_the_line_as_typed() {
    let mut kernel = kernel();
    submit(&mut kernel, "  fib   5 ");
    let job = kernel.registry().get(1).expect("job 1");
    assert_eq!(job.label, "  fib   5 ");
}

#[tokio::test]
async fn fib_multi_joins_results_in_order() {
    let mut kernel = kernel();
    submit(&mut kernel, "fib-multi 3 4 5");
    assert_eq!(
        wait_for(&kernel, 1).await,
        "The 3rd fibonacci number is 1; The 4th fibonacci number is 2; The 5th fibonacci number is 3"
    );
}

#[tokio::test]
async fn fib_multi_fails_as_a_whole() {
    let mut kernel = kernel();
    submit(&mut kernel, "fib-multi 3 0 5");
    let status = wait_for(&kernel, 1).await;
    assert!(status.starts_with("Error: invalid argument"), "{status}");
    assert!(!kernel.shutdown().is_exiting());
}

#[tokio::test]
async fn dex_lookups() {
    let mut kernel = kernel();
    submit(&mut kernel, "dex 25");
    submit(&mut kernel, "dex 0");
    submit(&mut kernel, "dex-multi 1 2");
    submit(&mut kernel, "dex-multi");

    assert_eq!(wait_for(&kernel, 1).await, "The pokemon with id 25 is entry-25");
    assert_eq!(wait_for(&kernel, 2).await, "Error: lookup failed: not found");
    assert_eq!(
        wait_for(&kernel, 3).await,
        "The pokemon with id 1 is entry-1\nThe pokemon with id 2 is entry-2"
    );
    assert_eq!(wait_for(&kernel, 4).await, "");
}

#[tokio::test]
async fn kill_cooperative_task() {
    let mut kernel = kernel();
    submit(&mut kernel, "dex 999");
    assert_eq!(output(&mut kernel, "kill 1"), "Task \"dex 999\" is killed");
    assert_eq!(wait_for(&kernel, 1).await, "Cancelled");
}

#[tokio::test]
async fn kill_pooled_unit() {
    let mut kernel = kernel();
    submit(&mut kernel, "fib 100000000");
    assert_eq!(output(&mut kernel, "kill 1"), "Task \"fib 100000000\" is killed");
    assert_eq!(wait_for(&kernel, 1).await, "Cancelled");
}

#[tokio::test]
async fn kill_fib_multi_cancels_the_whole_job() {
    let mut kernel = kernel();
    submit(&mut kernel, "fib-multi 1 400000000");
    assert_eq!(
        output(&mut kernel, "kill 1"),
        "Task \"fib-multi 1 400000000\" is killed"
    );
    assert_eq!(wait_for(&kernel, 1).await, "Cancelled");
    assert!(output(&mut kernel, "dash").contains("\tTrue\tCancelled"));
}

#[tokio::test]
async fn kill_after_finish_changes_nothing() {
    let mut kernel = kernel();
    submit(&mut kernel, "fib 10");
    let result = wait_for(&kernel, 1).await;
    assert_eq!(output(&mut kernel, "kill 1"), "Task \"fib 10\" is killed");
    assert_eq!(output(&mut kernel, "job 1"), result);
}

#[tokio::test]
async fn out_of_range_indices_are_recoverable() {
    let mut kernel = kernel();
    for line in ["job 1", "kill 1", "job 0"] {
        let err = kernel.execute(line).expect_err("out of range");
        assert!(
            matches!(
                err,
                KernelError::Registry(RegistryError::OutOfRange { count: 0, .. })
            ),
            "{line}: {err}"
        );
    }

    submit(&mut kernel, "fib 1");
    assert!(matches!(
        kernel.execute("job 2"),
        Err(KernelError::Registry(RegistryError::OutOfRange { index: 2, count: 1 }))
    ));
    assert!(!kernel.shutdown().is_exiting());
}

#[tokio::test]
async fn dashboard() {
    let mut kernel = kernel();
    assert_eq!(
        output(&mut kernel, "dash"),
        "id\tcommand         \tdone?\tresult\n==\t================\t=====\t======"
    );

    submit(&mut kernel, "fib 5");
    submit(&mut kernel, "dex 999");
    wait_for(&kernel, 1).await;

    let dash = output(&mut kernel, "dash");
    let rows: Vec<&str> = dash.lines().collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[2], "1\tfib 5           \tTrue\tThe 5th fibonacc");
    assert_eq!(rows[3], "2\tdex 999         \tFalse\t");
}

#[tokio::test]
async fn blank_lines_and_syntax_errors() {
    let mut kernel = kernel();
    assert_eq!(kernel.execute("").expect("blank"), Reply::Empty);
    assert_eq!(kernel.execute("   ").expect("blank"), Reply::Empty);
    assert!(matches!(kernel.execute("launch 1"), Err(KernelError::Syntax(_))));
    assert!(matches!(kernel.execute("fib -1"), Err(KernelError::Syntax(_))));
    assert!(kernel.registry().is_empty());
}

#[tokio::test]
async fn quit_replies_immediately_and_stops() {
    let mut kernel = kernel();
    submit(&mut kernel, "dex 999");

    assert_eq!(output(&mut kernel, "quit"), "Exiting");
    assert!(kernel.shutdown().is_exiting());
    wait_stopped(&kernel).await;

    assert_eq!(output(&mut kernel, "job 1"), "Cancelled");
    assert!(matches!(kernel.execute("fib 3"), Err(KernelError::Exiting)));
    assert!(output(&mut kernel, "dash").contains("dex 999"));
    assert_eq!(output(&mut kernel, "quit"), "Exiting");
}

#[tokio::test]
async fn shutdown_cancels_offloaded_units() {
    let mut kernel = kernel();
    submit(&mut kernel, "fib 100000000");
    output(&mut kernel, "quit");
    assert_eq!(wait_for(&kernel, 1).await, "Cancelled");
}

#[tokio::test]
async fn panicking_unit_triggers_shutdown() {
    let mut kernel = kernel();
    submit(&mut kernel, "dex 999");
    submit(&mut kernel, "dex 666");

    wait_stopped(&kernel).await;
    assert!(kernel.shutdown().is_exiting());

    let status = wait_for(&kernel, 2).await;
    assert!(status.contains("catalog exploded"), "{status}");
    assert_eq!(wait_for(&kernel, 1).await, "Cancelled");
}

#[cfg(unix)]
#[tokio::test]
async fn worker_dying_without_reply_triggers_shutdown() {
    let worker = WorkerCommand {
        program: "sh".into(),
        args: vec!["-c".into(), "read request; exit 3".into()],
    };
    let config = KernelConfig::processes().with_worker(worker);
    let mut kernel = Kernel::with_catalog(config, Arc::new(StubCatalog)).expect("kernel");

    submit(&mut kernel, "fib 5");
    wait_stopped(&kernel).await;
    assert!(kernel.shutdown().is_exiting());

    let status = wait_for(&kernel, 1).await;
    assert!(status.starts_with("Error: worker exited"), "{status}");
}
