use super::*;

use labrpc::network::Nodes;
use labrpc::Network;
use tokio::task::JoinHandle;

/// Id of the single server started by [`kv_server`].
pub const SERVER_ID: &str = "kv-0";

/// Serve `store` on a fresh network.
///
/// Returns a clerk for the server, the routing table of the network (to cut
/// the server off), and the server and network routines.
pub fn kv_server(store: KvStore) -> (Clerk, Nodes, JoinHandle<()>, JoinHandle<()>) {
    let mut net = Network::new();
    let nodes = net.nodes();

    let (client, server_routine) = net
        .register_service::<KvServer<KvStore>, _, _, _>(SERVER_ID.to_owned(), move || store.clone());
    let server = tokio::spawn(server_routine);
    let net_thread = tokio::spawn(async move {
        net.run().await;
    });
    (Clerk::new(client), nodes, server, net_thread)
}

#[tokio::test]
async fn test_put_get_append() {
    let _ = env_logger::try_init();
    let (clerk, _, _, _) = kv_server(KvStore::new());

    assert_eq!(clerk.get("k").await.unwrap(), None);
    clerk.put("k", "a").await.unwrap();
    assert_eq!(clerk.get("k").await.unwrap().as_deref(), Some("a"));
    clerk.put("k", "b").await.unwrap();
    assert_eq!(clerk.append("k", "c").await.unwrap(), "b");
    assert_eq!(clerk.append("new", "x").await.unwrap(), "");
    assert_eq!(clerk.get("k").await.unwrap().as_deref(), Some("bc"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_append() {
    const N: usize = 50;

    let _ = env_logger::try_init();
    let store = KvStore::new();
    let (clerk, _, _, _) = kv_server(store.clone());

    let mut appenders = Vec::new();
    for i in 0..N {
        let clerk = clerk.clone();
        appenders.push(tokio::spawn(async move {
            clerk.append("log", &format!("[{}]", i)).await.unwrap()
        }));
    }
    let mut previous = Vec::new();
    for a in appenders {
        previous.push(a.await.expect("appenders should not panic"));
    }

    let value = store.get("log").unwrap();
    for i in 0..N {
        assert_eq!(value.matches(&format!("[{}]", i)).count(), 1);
    }
    // Every append saw a distinct prefix of the final value.
    previous.sort_by_key(String::len);
    previous.dedup();
    assert_eq!(previous.len(), N);
    assert!(previous.iter().all(|p| value.starts_with(p.as_str())));
}

#[tokio::test]
async fn test_disconnected_server_fails_call() {
    let _ = env_logger::try_init();
    let (clerk, nodes, _, _) = kv_server(KvStore::new());

    clerk.put("k", "v").await.unwrap();
    assert!(nodes.contains(SERVER_ID));
    assert!(nodes.disconnect(SERVER_ID));
    assert!(clerk.get("k").await.is_err());
}
