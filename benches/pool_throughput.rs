//! Pool throughput benchmark suite.
//!
//! Benchmarks checkout cycles against a live in-process binary RPC
//! server:
//! - `get_release`: pure pool overhead, no call
//! - `get_call_release`: full cycle including one `HelloWorld.Hello` call
//!
//! Run with: cargo bench --bench pool_throughput
//! Results saved to: target/criterion/

use std::net::SocketAddr;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;

use rpc_pool::{CallRequest, CallResponse, RpcConnPool};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const INITIAL_CAP: usize = 8;
const MAX_CAP: usize = 16;

// ============================================================================
// Test Server
// ============================================================================

/// Serves length-prefixed CBOR `HelloWorld.Hello` calls forever.
async fn serve_binary(stream: TcpStream) {
    let mut io = BufStream::new(stream);
    loop {
        let Ok(len) = io.read_u32().await else { break };
        let mut payload = vec![0u8; len as usize];
        if io.read_exact(&mut payload).await.is_err() {
            break;
        }
        let Ok(request) = ciborium::de::from_reader::<CallRequest, _>(payload.as_slice())
        else {
            break;
        };

        let response = CallResponse::success(request.id, json!("HelloWorld"));
        let mut out = Vec::new();
        ciborium::ser::into_writer(&response, &mut out).expect("encode");

        #[allow(clippy::cast_possible_truncation)]
        if io.write_u32(out.len() as u32).await.is_err()
            || io.write_all(&out).await.is_err()
            || io.flush().await.is_err()
        {
            break;
        }
    }
}

async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(serve_binary(stream));
        }
    });
    addr
}

async fn setup_pool() -> Arc<RpcConnPool> {
    let addr = spawn_server().await;
    Arc::new(
        RpcConnPool::builder()
            .capacity(INITIAL_CAP, MAX_CAP)
            .dial_addr(addr.to_string())
            .build()
            .await
            .expect("pool"),
    )
}

// ============================================================================
// Benchmark: Get/Release Cycle
// ============================================================================

fn bench_get_release(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let pool = rt.block_on(setup_pool());

    c.bench_function("get_release", |b| {
        b.to_async(&rt).iter(|| {
            let pool = Arc::clone(&pool);
            async move {
                let client = pool.get().await.expect("get");
                pool.release(&client).await;
            }
        });
    });

    rt.block_on(pool.close());
}

// ============================================================================
// Benchmark: Get/Call/Release Cycle
// ============================================================================

fn bench_get_call_release(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let pool = rt.block_on(setup_pool());

    c.bench_function("get_call_release", |b| {
        b.to_async(&rt).iter(|| {
            let pool = Arc::clone(&pool);
            async move {
                let client = pool.get().await.expect("get");
                let reply: String = client.call("HelloWorld.Hello", &()).await.expect("call");
                assert_eq!(reply, "HelloWorld");
                pool.release(&client).await;
            }
        });
    });

    rt.block_on(pool.close());
}

criterion_group!(benches, bench_get_release, bench_get_call_release);
criterion_main!(benches);
