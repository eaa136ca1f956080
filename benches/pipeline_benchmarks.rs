// ABOUTME: Measures pipelined request throughput on a single connection over real loopback TCP
// ABOUTME: The property under measurement is scenario 2/4 from the design docs: d, not N*d

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, Criterion};
use pipeline_tcp::{Server, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;

async fn echo(request: Bytes, _context: Arc<()>) -> Bytes {
    request
}

async fn spawn_echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let server = Server::new(ServerConfig::new(&addr, "\n"), echo, ());
    tokio::spawn(server.run());
    tokio::time::sleep(Duration::from_millis(20)).await;
    addr
}

fn pipelined_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let addr = rt.block_on(spawn_echo_server());

    let mut group = c.benchmark_group("pipelined_round_trip");
    for pipeline_depth in [1usize, 16, 256] {
        group.bench_function(format!("depth_{pipeline_depth}"), |b| {
            b.to_async(&rt).iter(|| {
                let addr = addr.clone();
                async move {
                    let mut conn = TcpStream::connect(&addr).await.unwrap();

                    let mut request = Vec::new();
                    for i in 0..pipeline_depth {
                        request.extend_from_slice(format!("req-{i}\n").as_bytes());
                    }
                    conn.write_all(&request).await.unwrap();

                    let mut out = vec![0u8; request.len()];
                    conn.read_exact(&mut out).await.unwrap();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, pipelined_round_trip);
criterion_main!(benches);
