use map_reduce::app::wc;
use map_reduce::partition::{bucket_of, intermediate_path, output_path};
use map_reduce::{
    execute_map, transport, Assignment, Coordinator, CoordinatorConfig, KeyValue, MapTask,
    TaskKind, TaskStatus, Worker, WorkerConfig,
};
use rand::seq::SliceRandom;
use rand::Rng;
use tarpc::context;
use tempfile::TempDir;
use tokio::time;

use std::collections::HashMap;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::time::Duration;

const WORDS: &[&str] = &[
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa",
];

fn config(nreduce: usize, timeout: Duration) -> CoordinatorConfig {
    CoordinatorConfig {
        nreduce,
        task_timeout: timeout,
        scan_interval: Duration::from_millis(20),
        linger: Duration::from_millis(100),
    }
}

fn worker_config(dir: &Path) -> WorkerConfig {
    WorkerConfig {
        dir: dir.to_owned(),
        retry_interval: Duration::from_millis(20),
    }
}

fn random_inputs(dir: &Path, n: usize) -> Vec<PathBuf> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|i| {
            let len = rng.gen_range(50..200);
            let words: Vec<&str> = (0..len)
                .map(|_| *WORDS.choose(&mut rng).unwrap())
                .collect();
            let p = dir.join(format!("pg-{}.txt", i));
            fs::write(&p, words.join(" ")).unwrap();
            p
        })
        .collect()
}

/// Result of running word count over `files` in one process.
fn sequential(files: &[PathBuf]) -> HashMap<String, String> {
    let mut cnt = HashMap::<String, Vec<String>>::new();
    for fname in files {
        let contents = fs::read_to_string(fname).unwrap();
        for KeyValue { key, value } in wc::map(fname, &contents) {
            cnt.entry(key).or_default().push(value);
        }
    }
    cnt.into_iter()
        .map(|(k, vs)| {
            let v = wc::reduce(&k, &vs);
            (k, v)
        })
        .collect()
}

/// Collect all output files, checking ordering, bucket placement and uniqueness.
fn collect_output(dir: &Path, nreduce: usize) -> HashMap<String, String> {
    let mut result = HashMap::<String, String>::new();
    for r in 0..nreduce {
        let s = fs::read_to_string(output_path(dir, r)).unwrap();
        let mut prev: Option<String> = None;
        for l in s.lines() {
            let kv: Vec<&str> = l.split(' ').collect();
            assert_eq!(kv.len(), 2, "malformed line {:?}", l);
            assert_eq!(bucket_of(kv[0], nreduce), r, "{} in wrong bucket", kv[0]);
            if let Some(p) = &prev {
                assert!(p.as_str() < kv[0], "keys not strictly ascending");
            }
            prev = Some(kv[0].to_owned());
            assert!(result.insert(kv[0].to_owned(), kv[1].to_owned()).is_none());
        }
    }
    result
}

fn free_port() -> SocketAddr {
    let l = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    l.local_addr().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn word_count_over_tcp_matches_sequential() {
    let _ = pretty_env_logger::try_init();

    const NREDUCE: usize = 5;
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let dir = temp_dir.path();
    let files = random_inputs(dir, 8);

    let coordinator =
        Coordinator::new(files.clone(), config(NREDUCE, Duration::from_secs(10))).unwrap();
    let local = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
    let (addr, accept) = transport::listen(coordinator.clone(), local).await.unwrap();
    let server = tokio::spawn(accept);
    let detector = coordinator.spawn_failure_detector();

    let mut workers = Vec::new();
    for _ in 0..4 {
        let client = transport::connect(addr).await.unwrap();
        let worker = Worker::new(client, worker_config(dir), wc::map, wc::reduce);
        workers.push(tokio::spawn(async move { worker.launch().await }));
    }

    let mut maps = 0;
    let mut reduces = 0;
    for w in workers {
        let stats = w.await.unwrap().unwrap();
        maps += stats.maps;
        reduces += stats.reduces;
    }
    assert_eq!(maps, files.len());
    assert_eq!(reduces, NREDUCE);

    time::timeout(Duration::from_secs(1), coordinator.wait_done())
        .await
        .expect("coordinator should be done");
    assert_eq!(collect_output(dir, NREDUCE), sequential(&files));

    server.abort();
    detector.abort();
}

#[tokio::test]
async fn one_key_from_two_files() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let files = vec![dir.join("1.txt"), dir.join("2.txt")];
    fs::write(&files[0], "a").unwrap();
    fs::write(&files[1], "a").unwrap();

    let coordinator = Coordinator::new(files, config(1, Duration::from_secs(10))).unwrap();
    let client = transport::in_process(coordinator.clone());
    let worker = Worker::new(client.clone(), worker_config(dir), wc::map, wc::reduce);
    let stats = worker.launch().await.unwrap();
    assert_eq!((stats.maps, stats.reduces), (2, 1));

    assert_eq!(fs::read_to_string(output_path(dir, 0)).unwrap(), "a 2\n");
    assert_eq!(
        client.request_map_task(context::current()).await.unwrap(),
        Assignment::PhaseComplete
    );
    assert!(client.job_done(context::current()).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stalled_task_is_reassigned_and_late_report_is_harmless() {
    let _ = pretty_env_logger::try_init();

    const NREDUCE: usize = 3;
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let files = random_inputs(dir, 3);

    let coordinator =
        Coordinator::new(files.clone(), config(NREDUCE, Duration::from_millis(200))).unwrap();
    let detector = coordinator.spawn_failure_detector();

    // A worker that takes map task 0 and then stalls.
    let stalled = transport::in_process(coordinator.clone());
    let task: MapTask = match stalled.request_map_task(context::current()).await.unwrap() {
        Assignment::Assigned(t) => t,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(task.id, 0);

    let client = transport::in_process(coordinator.clone());
    let worker = Worker::new(client, worker_config(dir), wc::map, wc::reduce);
    let stats = time::timeout(Duration::from_secs(10), worker.launch())
        .await
        .expect("healthy worker should finish")
        .unwrap();
    // The healthy worker had to wait for the lease on task 0 to expire.
    assert_eq!((stats.maps, stats.reduces), (3, NREDUCE));
    assert!(coordinator.is_done());

    let snapshot: Vec<Option<Vec<u8>>> = (0..NREDUCE)
        .map(|b| fs::read(intermediate_path(dir, 0, b)).ok())
        .collect();
    let output = collect_output(dir, NREDUCE);

    // The stalled worker wakes up, redoes the work and reports.
    execute_map(dir, &task, NREDUCE, wc::map).unwrap();
    let reply = stalled
        .report_completion(context::current(), task.id, TaskKind::Map)
        .await
        .unwrap();
    assert!(!reply.recorded);

    let after: Vec<Option<Vec<u8>>> = (0..NREDUCE)
        .map(|b| fs::read(intermediate_path(dir, 0, b)).ok())
        .collect();
    assert_eq!(snapshot, after);
    assert_eq!(collect_output(dir, NREDUCE), output);
    assert_eq!(output, sequential(&files));
    assert!(coordinator.is_done());

    time::timeout(Duration::from_secs(1), detector)
        .await
        .expect("detector should stop once the job is done")
        .unwrap();
}

#[tokio::test]
async fn completed_status_survives_timeouts() {
    let temp_dir = TempDir::new().unwrap();
    let files = random_inputs(temp_dir.path(), 2);
    let coordinator = Coordinator::new(files, config(1, Duration::from_millis(30))).unwrap();
    let detector = coordinator.spawn_failure_detector();

    assert!(matches!(coordinator.next_map_task(), Assignment::Assigned(_)));
    coordinator.report(TaskKind::Map, 0);
    time::sleep(Duration::from_millis(150)).await;
    assert_eq!(coordinator.status(TaskKind::Map, 0), Some(TaskStatus::Completed));

    // Task 1 was never assigned, task 0 stays completed however long we wait.
    assert!(matches!(
        coordinator.next_map_task(),
        Assignment::Assigned(MapTask { id: 1, .. })
    ));
    assert_eq!(coordinator.next_map_task(), Assignment::Wait);
    time::sleep(Duration::from_millis(150)).await;
    assert!(matches!(
        coordinator.next_map_task(),
        Assignment::Assigned(MapTask { id: 1, .. })
    ));
    coordinator.report(TaskKind::Map, 0);
    assert_eq!(coordinator.next_map_task(), Assignment::Wait);
    assert_eq!(coordinator.status(TaskKind::Map, 0), Some(TaskStatus::Completed));
    detector.abort();
}

#[tokio::test]
async fn unreachable_coordinator_is_an_error() {
    let addr = free_port();
    assert!(transport::connect(addr).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn launch_returns_after_job_done() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_owned();
    let files = random_inputs(&dir, 2);
    let addr = free_port();

    let coordinator = Coordinator::new(files, config(2, Duration::from_secs(10))).unwrap();
    let server = tokio::spawn(coordinator.clone().launch(addr));

    // Give the listener a moment to bind.
    let client = loop {
        match transport::connect(addr).await {
            Ok(c) => break c,
            Err(_) => time::sleep(Duration::from_millis(10)).await,
        }
    };
    let worker = Worker::new(client, worker_config(&dir), wc::map, wc::reduce);
    worker.launch().await.unwrap();

    time::timeout(Duration::from_secs(5), server)
        .await
        .expect("coordinator should stop after the job is done")
        .unwrap()
        .unwrap();
}
