use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use hkv_client::{ClientConfig, ClientError, KVClient};
use hkv_common::{Distance, Metric, NullableResult, Point};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn spawn_server(expected_commands: usize, handler: fn(usize, Vec<Vec<u8>>, &mut TcpStream)) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        for idx in 0..expected_commands {
            let args = read_command(&mut reader).expect("read command");
            handler(idx, args, &mut stream);
        }
    });

    addr
}

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Vec<Vec<u8>>> {
    let mut line = Vec::new();
    read_line(reader, &mut line)?.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
    if line.first() != Some(&b'*') {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected array"));
    }
    let count = parse_usize(&line[1..])?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        read_line(reader, &mut line)?.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
        if line.first() != Some(&b'$') {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected bulk"));
        }
        let len = parse_usize(&line[1..])?;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf)?;
        if crlf != [b'\r', b'\n'] {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "missing crlf"));
        }
        args.push(data);
    }
    Ok(args)
}

fn read_line(reader: &mut BufReader<TcpStream>, buf: &mut Vec<u8>) -> std::io::Result<Option<()>> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Ok(None);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid line"));
    }
    buf.truncate(buf.len() - 2);
    Ok(Some(()))
}

fn parse_usize(data: &[u8]) -> std::io::Result<usize> {
    if data.is_empty() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "empty"));
    }
    let mut value = 0usize;
    for &b in data {
        if !b.is_ascii_digit() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "digit"));
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as usize);
    }
    Ok(value)
}

fn write_error(stream: &mut TcpStream, msg: &str) {
    let _ = stream.write_all(b"-");
    let _ = stream.write_all(msg.as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn write_bulk(stream: &mut TcpStream, data: &[u8]) {
    let _ = stream.write_all(b"$");
    let _ = stream.write_all(data.len().to_string().as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.write_all(data);
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn write_integer(stream: &mut TcpStream, value: i64) {
    let _ = stream.write_all(b":");
    let _ = stream.write_all(value.to_string().as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn client_with_addr(addr: String) -> KVClient {
    let config = ClientConfig {
        addr,
        connect_timeout_ms: Some(1_000),
        command_timeout_ms: Some(1_000),
        ..ClientConfig::default()
    };
    KVClient::with_config(config).expect("client")
}

#[test]
fn client_geo_add_and_distance_in_kilometers() -> anyhow::Result<()> {
    init_tracing();
    let addr = spawn_server(2, |idx, args, stream| {
        if idx == 0 {
            assert_eq!(args[0], b"GEOADD");
            assert_eq!(args[1], b"places");
            assert_eq!(args[4], b"a");
            write_integer(stream, 1);
        } else {
            assert_eq!(args[0], b"GEODIST");
            assert_eq!(&args[2..], &[b"a".to_vec(), b"b".to_vec(), b"m".to_vec()]);
            write_bulk(stream, b"1000.0");
        }
    });

    let client = client_with_addr(addr);
    let geo = client.geo();
    let added = geo.geo_add(b"places", Point::new(13.361389, 38.115556), b"a")?;
    assert_eq!(added.into_value()?, 1);

    let dist = geo
        .geo_dist_in(b"places", b"a", b"b", Metric::Kilometers)?
        .into_value()?;
    assert_eq!(dist, NullableResult::of(Some(Distance::new(1.0, Metric::Kilometers))));
    Ok(())
}

#[test]
fn client_server_error_is_data_access() {
    init_tracing();
    let addr = spawn_server(1, |_, _, stream| {
        write_error(stream, "WRONGTYPE Operation against a key holding the wrong kind of value");
    });

    let client = client_with_addr(addr);
    let err = client.geo().geo_dist(b"places", b"a", b"b").unwrap_err();
    match err {
        ClientError::DataAccess { message } => assert!(message.contains("WRONGTYPE")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn client_pipeline_resolves_on_close() -> anyhow::Result<()> {
    init_tracing();
    let addr = spawn_server(2, |idx, args, stream| {
        if idx == 0 {
            assert_eq!(args[0], b"ZREM");
            write_integer(stream, 2);
        } else {
            assert_eq!(args[0], b"GEODIST");
            write_bulk(stream, b"250");
        }
    });

    let client = client_with_addr(addr);
    client.open_pipeline()?;
    let removed = client.geo().geo_remove(b"places", &["a", "b"])?;
    let dist = client.geo().geo_dist(b"places", b"c", b"d")?;
    assert!(!removed.is_ready());
    assert!(!dist.is_ready());

    assert_eq!(client.close_pipeline()?, 2);
    assert_eq!(removed.into_value()?, 2);
    assert_eq!(dist.into_value()?, NullableResult::of(Some(Distance::meters(250.0))));
    Ok(())
}

#[test]
fn client_reports_closed_connection() {
    init_tracing();
    let addr = spawn_server(1, |_, _, _| {});

    let client = client_with_addr(addr);
    let err = client.zset().z_rem(b"set", &["a"]).unwrap_err();
    assert_eq!(err, ClientError::data_access("connection closed"));
}

#[test]
fn client_command_timeout_is_data_access() {
    init_tracing();
    let addr = spawn_server(1, |_, _, _| {
        thread::sleep(Duration::from_millis(500));
    });

    let config = ClientConfig {
        addr,
        command_timeout_ms: Some(50),
        ..ClientConfig::default()
    };
    let client = KVClient::with_config(config).expect("client");
    let err = client.zset().z_rem(b"set", &["a"]).unwrap_err();
    match err {
        ClientError::DataAccess { message } => assert!(message.contains("timed out")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn client_fails_commands_after_server_closes() -> anyhow::Result<()> {
    init_tracing();
    let addr = spawn_server(1, |_, args, stream| {
        assert_eq!(args[0], b"ZREM");
        write_integer(stream, 1);
    });

    let config = ClientConfig {
        addr,
        command_timeout_ms: None,
        ..ClientConfig::default()
    };
    let client = KVClient::with_config(config)?;
    assert_eq!(client.zset().z_rem(b"set", &["a"])?.into_value()?, 1);
    thread::sleep(Duration::from_millis(200));

    let (done, outcome) = mpsc::channel();
    thread::spawn(move || {
        let _ = done.send(client.zset().z_rem(b"set", &["b"]).map(|reply| reply.is_ready()));
    });
    let err = outcome
        .recv_timeout(Duration::from_secs(3))
        .expect("command after close must not hang")
        .unwrap_err();
    assert!(matches!(err, ClientError::DataAccess { .. }), "{err}");
    Ok(())
}

#[test]
fn client_can_be_dropped_inside_async_code() -> anyhow::Result<()> {
    init_tracing();
    let addr = spawn_server(0, |_, _, _| {});
    let client = client_with_addr(addr);

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    runtime.block_on(async move {
        drop(client);
    });
    Ok(())
}
