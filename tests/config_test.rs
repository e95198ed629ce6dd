//! Loading configuration files from disk

use std::fs;
use std::path::PathBuf;

use apexdns::dns::config::{ConfigError, ServerConfig};
use apexdns::dns::context::ServerContext;
use apexdns::dns::protocol::DnsQuestion;
use apexdns::dns::query_type::RecordType;

fn write_config(file_name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{}", std::process::id(), file_name));
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_config_file() {
    let path = write_config(
        "zone.toml",
        r#"
        [server]
        listen = "127.0.0.1:5300"
        zone = "example.net."
        threads = 3

        [[records]]
        name = "www.example.net"
        type = "A"
        value = "198.51.100.7"

        [[records]]
        name = "alias.example.net"
        type = "CNAME"
        ttl = 120
        value = "www.example.net"

        [[records]]
        name = "example.net"
        type = "TXT"
        value = "v=spf1 -all"
        "#,
    );

    let context = ServerContext::load(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(5300, context.listen.port());
    assert_eq!(3, context.thread_count);
    assert_eq!("example.net", context.authority.apex());
    assert_eq!(3, context.authority.records().len());

    let res = context
        .authority
        .resolve(&DnsQuestion::new("WWW.example.net".to_string(), RecordType::A));
    assert!(res.authoritative);
    assert_eq!(vec![198, 51, 100, 7], res.answers[0].data);
    assert_eq!(3600, res.answers[0].ttl);

    let res = context
        .authority
        .resolve(&DnsQuestion::new("alias.example.net".to_string(), RecordType::Cname));
    assert_eq!(120, res.answers[0].ttl);
    assert_eq!(b"\x03www\x07example\x03net\x00".to_vec(), res.answers[0].data);

    let res = context
        .authority
        .resolve(&DnsQuestion::new("example.net".to_string(), RecordType::Txt));
    assert_eq!(b"\x0bv=spf1 -all".to_vec(), res.answers[0].data);
}

#[test]
fn test_load_invalid_file() {
    let path = write_config(
        "broken.toml",
        "[[records]]\nname = \"www.example.net\"\ntype = \"A\"\nvalue = \"not-an-address\"\n",
    );

    let res = ServerConfig::load(&path);
    fs::remove_file(&path).unwrap();

    match res {
        Err(ConfigError::InvalidRecord { name, .. }) => assert_eq!("www.example.net", name),
        other => panic!("unexpected result: {:?}", other),
    }
}
