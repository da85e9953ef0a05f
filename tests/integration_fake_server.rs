use anyhow::Result;
use geofence_bench::{
    cli::Args,
    transport::{resp::parse_reply, Reply},
    BenchmarkConfig, BenchmarkRunner, PhaseKind,
};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Recorded = Arc<Mutex<Vec<Vec<String>>>>;

/// Minimal RESP server: records every command and answers `+OK`, or an
/// error reply for commands named `fail_on`.
async fn spawn_fake_server(fail_on: Option<&'static str>) -> Result<(String, Recorded)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));

    let commands = Arc::clone(&recorded);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_connection(stream, Arc::clone(&commands), fail_on));
        }
    });

    Ok((addr, recorded))
}

async fn serve_connection(mut stream: TcpStream, commands: Recorded, fail_on: Option<&'static str>) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&chunk[..n]);

        let mut out = Vec::new();
        while let Ok(Some((reply, used))) = parse_reply(&buffer) {
            buffer.drain(..used);
            let args = command_args(reply);
            if fail_on.is_some_and(|name| args.first().map(String::as_str) == Some(name)) {
                out.extend_from_slice(b"-ERR rejected\r\n");
            } else {
                out.extend_from_slice(b"+OK\r\n");
            }
            commands.lock().unwrap().push(args);
        }

        if !out.is_empty() && stream.write_all(&out).await.is_err() {
            return;
        }
    }
}

fn command_args(reply: Reply) -> Vec<String> {
    match reply {
        Reply::Array(Some(items)) => items
            .into_iter()
            .map(|item| match item {
                Reply::Bulk(Some(data)) => String::from_utf8_lossy(&data).into_owned(),
                other => panic!("expected bulk string argument, got {:?}", other),
            })
            .collect(),
        other => panic!("expected command array, got {:?}", other),
    }
}

/// Run all four phases against the fake server and check what it saw.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_run_against_fake_server() -> Result<()> {
    let (addr, recorded) = spawn_fake_server(None).await?;

    let args = Args {
        addr,
        num_fences: 100,
        pipeline: 10,
        clients: 4,
        seed: Some(42),
        ..Args::default()
    };
    let config = BenchmarkConfig::from_args(&args)?;
    let results = BenchmarkRunner::new(config).run().await?;

    let phases: Vec<PhaseKind> = results.phases.iter().map(|p| p.phase).collect();
    assert_eq!(phases, PhaseKind::ALL.to_vec());
    for phase in &results.phases {
        assert_eq!(phase.metrics.throughput.total_ops, 100);
        assert_eq!(phase.metrics.throughput.workers, 4);
    }
    for conn in &results.connections {
        assert_eq!(conn.commands_sent, 100);
        assert_eq!(conn.replies_read, 100);
    }

    let commands = recorded.lock().unwrap().clone();
    let setchan = commands.iter().filter(|c| c[0] == "SETCHAN").count();
    let set = commands.iter().filter(|c| c[0] == "SET").count();
    assert_eq!(setchan, 100);
    assert_eq!(set, 300);

    let fence = commands
        .iter()
        .find(|c| c[0] == "SETCHAN" && c[1] == "0")
        .expect("SETCHAN for id 0");
    assert_eq!(&fence[2..7], ["NEARBY", "fleet", "DETECT", "enter,exit", "POINT"]);
    assert_eq!(fence[9], "5000");

    // Phases are separated by a full drain, so id 0's writes arrive in phase order.
    let writes: Vec<&Vec<String>> = commands
        .iter()
        .filter(|c| c[0] == "SET" && c[2] == "0")
        .collect();
    assert_eq!(writes.len(), 3);
    let (lat, lon) = (&writes[0][4], &writes[0][5]);
    assert_eq!((lat, lon), (&fence[7], &fence[8]));
    assert_eq!(writes[0], writes[1]);
    assert_eq!((&writes[2][4], &writes[2][5]), (lon, lat));
    Ok(())
}

/// An error reply from the server aborts the run during that phase.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_reply_aborts_run() -> Result<()> {
    let (addr, recorded) = spawn_fake_server(Some("SET")).await?;

    let args = Args {
        addr,
        num_fences: 50,
        pipeline: 5,
        clients: 2,
        seed: Some(1),
        ..Args::default()
    };
    let config = BenchmarkConfig::from_args(&args)?;
    let err = BenchmarkRunner::new(config).run().await.unwrap_err();

    assert!(err.to_string().contains("SET-POINTS"));
    assert!(format!("{:#}", err).contains("ERR rejected"));

    // SETCHAN completed; SET-POINTS stopped early and nothing after it ran.
    let commands = recorded.lock().unwrap().clone();
    assert_eq!(commands.iter().filter(|c| c[0] == "SETCHAN").count(), 50);
    let sets = commands.iter().filter(|c| c[0] == "SET").count();
    assert!(sets >= 1);
    assert!(sets < 50, "{} SET commands reached the server", sets);
    assert_eq!(commands.len(), 50 + sets);
    Ok(())
}

/// Nothing is listening, so building the pool fails before any phase runs.
#[tokio::test]
async fn unreachable_server_fails_to_connect() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    drop(listener);

    let args = Args {
        addr: addr.clone(),
        num_fences: 10,
        clients: 2,
        seed: Some(1),
        ..Args::default()
    };
    let config = BenchmarkConfig::from_args(&args)?;
    let err = BenchmarkRunner::new(config).run().await.unwrap_err();
    assert!(err.to_string().contains(&addr));
    Ok(())
}
