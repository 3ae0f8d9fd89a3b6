//! End-to-end runs of the file pipelines over captures on disk.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::atomic::AtomicBool;

use macaddr::MacAddr6;
use tempfile::TempDir;

use osi_replay::checksum::{verify_ipv4_header, verify_transport, PseudoHeader};
use osi_replay::config::PolicyFile;
use osi_replay::container::{ByteOrder, TsResolution};
use osi_replay::layers::{ethertype, ip_protocol, Ethernet, Ipv4, Tcp};
use osi_replay::pipeline::{rewrite_file, transform_file};
use osi_replay::{
    CaptureReader, CaptureRecord, CaptureWriter, FileMeta, FilterPolicy, Layer, LayerStack,
    LinkType,
};

fn mac(text: &str) -> MacAddr6 {
    osi_replay::utils::parse_mac(text).unwrap()
}

fn tcp_frame(source: Ipv4Addr, destination: Ipv4Addr, payload: &[u8]) -> Vec<u8> {
    LayerStack::new(vec![
        Layer::Ethernet(Ethernet {
            destination: mac("aa:bb:cc:dd:ee:ff"),
            source: mac("00:11:22:33:44:55"),
            ethertype: ethertype::IPV4,
        }),
        Layer::Ipv4(Ipv4 {
            version: 4,
            header_len: 5,
            tos: 0,
            total_length: 0,
            identification: 0x4242,
            flags_fragment: 0x4000,
            ttl: 64,
            protocol: ip_protocol::TCP,
            checksum: 0,
            source,
            destination,
            options: Vec::new(),
        }),
        Layer::Tcp(Tcp {
            source_port: 51000,
            destination_port: 80,
            sequence: 1000,
            acknowledgment: 2000,
            data_offset: 5,
            flags: osi_replay::layers::tcp_flags::ACK | osi_replay::layers::tcp_flags::PSH,
            window: 502,
            checksum: 0,
            urgent_pointer: 0,
            options: Vec::new(),
        }),
        Layer::Opaque(payload.to_vec()),
    ])
    .encode()
    .unwrap()
}

fn write_capture(path: &Path, meta: FileMeta, frames: &[Vec<u8>]) {
    let mut writer = CaptureWriter::create(path, meta).unwrap();
    for (i, frame) in frames.iter().enumerate() {
        let record = CaptureRecord::from_frame(1_700_000_000 + i as u32, 123 * i as u32, frame.clone());
        writer.write_record(&record).unwrap();
    }
    writer.flush().unwrap();
}

fn read_capture(path: &Path) -> (FileMeta, Vec<CaptureRecord>) {
    let reader = CaptureReader::open(path).unwrap();
    let meta = *reader.meta();
    let records = reader.collect::<Result<Vec<_>, _>>().unwrap();
    (meta, records)
}

const MAPPING: &str = r#"
[mac.source]
"00:11:22:33:44:55" = "66:77:88:99:aa:bb"

[mac.destination]
"aa:bb:cc:dd:ee:ff" = "11:22:33:44:55:66"

[ip.source]
"192.168.1.100" = "10.0.0.5"

[ip.destination]
"192.168.1.200" = "10.0.0.10"
"#;

#[test]
fn rewrite_changes_only_mapped_fields() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.pcap");
    let output = dir.path().join("out.pcap");
    let config = dir.path().join("map.toml");
    std::fs::write(&config, MAPPING).unwrap();

    let mapped = tcp_frame(
        Ipv4Addr::new(192, 168, 1, 100),
        Ipv4Addr::new(192, 168, 1, 200),
        b"GET / HTTP/1.1\r\n\r\n",
    );
    let mut unmapped = tcp_frame(
        Ipv4Addr::new(172, 16, 0, 1),
        Ipv4Addr::new(172, 16, 0, 2),
        b"hello",
    );
    // no mapping applies to this frame at any layer
    unmapped[6..12].copy_from_slice(mac("02:00:00:00:00:01").as_bytes());
    unmapped[0..6].copy_from_slice(mac("02:00:00:00:00:02").as_bytes());
    write_capture(&input, FileMeta::default(), &[mapped.clone(), unmapped.clone()]);

    let policy = PolicyFile::load(&config).unwrap().rewrite_policy().unwrap();
    let stats = rewrite_file(&input, &output, policy, 1, &AtomicBool::new(true)).unwrap();
    assert_eq!(stats.read, 2);
    assert_eq!(stats.written, 2);
    assert_eq!(stats.modified, 1);

    let (_, records) = read_capture(&output);
    let out = records[0].data();
    assert_eq!(out.len(), mapped.len());
    assert_eq!(&out[0..6], mac("11:22:33:44:55:66").as_bytes());
    assert_eq!(&out[6..12], mac("66:77:88:99:aa:bb").as_bytes());
    assert_eq!(&out[26..30], &[10, 0, 0, 5]);
    assert_eq!(&out[30..34], &[10, 0, 0, 10]);
    assert!(verify_ipv4_header(&out[14..34]));

    let pseudo = PseudoHeader::new(
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 10)),
    )
    .unwrap();
    assert!(verify_transport(&pseudo, ip_protocol::TCP, &out[34..]));
    assert_eq!(&out[54..], b"GET / HTTP/1.1\r\n\r\n");

    // timestamps carried over, untouched frame byte-identical
    assert_eq!(records[0].ts_sec(), 1_700_000_000);
    assert_eq!(records[1].ts_frac(), 123);
    assert_eq!(records[1].data(), &unmapped[..]);
}

#[test]
fn rewrite_with_workers_matches_sequential_run() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.pcap");
    let sequential = dir.path().join("seq.pcap");
    let parallel = dir.path().join("par.pcap");

    let frames: Vec<Vec<u8>> = (0..300u32)
        .map(|i| {
            let source = if i % 2 == 0 {
                Ipv4Addr::new(192, 168, 1, 100)
            } else {
                Ipv4Addr::new(192, 168, 1, (i % 250) as u8)
            };
            tcp_frame(source, Ipv4Addr::new(192, 168, 1, 200), &i.to_be_bytes())
        })
        .collect();
    write_capture(&input, FileMeta::default(), &frames);

    let policy = PolicyFile::from_toml(MAPPING).unwrap().rewrite_policy().unwrap();
    let running = AtomicBool::new(true);
    let a = rewrite_file(&input, &sequential, policy.clone(), 1, &running).unwrap();
    let b = rewrite_file(&input, &parallel, policy, 4, &running).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.written, 300);
    assert_eq!(
        std::fs::read(&sequential).unwrap(),
        std::fs::read(&parallel).unwrap()
    );
}

#[test]
fn output_inherits_input_header() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.pcap");
    let output = dir.path().join("out.pcap");

    let meta = FileMeta {
        byte_order: ByteOrder::Big,
        resolution: TsResolution::Nano,
        snap_len: 262144,
        ..FileMeta::default()
    };
    let frame = tcp_frame(
        Ipv4Addr::new(192, 168, 1, 100),
        Ipv4Addr::new(8, 8, 8, 8),
        b"x",
    );
    write_capture(&input, meta, &[frame]);

    let policy = PolicyFile::from_toml(MAPPING).unwrap().rewrite_policy().unwrap();
    rewrite_file(&input, &output, policy, 1, &AtomicBool::new(true)).unwrap();

    let (out_meta, records) = read_capture(&output);
    assert_eq!(out_meta, meta);
    assert_eq!(records.len(), 1);
    assert_eq!(&records[0].data()[26..30], &[10, 0, 0, 5]);
}

#[test]
fn transform_drops_blocklisted_traffic() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.pcap");
    let output = dir.path().join("out.pcap");

    let blocked_source = tcp_frame(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(192, 168, 0, 1), b"a");
    let blocked_destination =
        tcp_frame(Ipv4Addr::new(192, 168, 0, 1), Ipv4Addr::new(10, 0, 0, 1), b"b");
    let kept = tcp_frame(Ipv4Addr::new(192, 168, 100, 5), Ipv4Addr::new(192, 168, 0, 1), b"c");
    let runt = vec![0u8; 8];
    write_capture(
        &input,
        FileMeta::default(),
        &[blocked_source, kept.clone(), runt, blocked_destination],
    );

    let policy = FilterPolicy::default().with_blocked(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    let stats = transform_file(&input, &output, policy, 2, &AtomicBool::new(true)).unwrap();
    assert_eq!(stats.read, 4);
    assert_eq!(stats.written, 1);
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.decode_errors, 1);

    let (_, records) = read_capture(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data(), &kept[..]);
}

#[test]
fn raw_ip_captures_are_filtered_too() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.pcap");
    let output = dir.path().join("out.pcap");

    let frames: Vec<Vec<u8>> = [Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(192, 168, 100, 5)]
        .iter()
        .map(|source| tcp_frame(*source, Ipv4Addr::new(192, 168, 0, 1), b"raw")[14..].to_vec())
        .collect();
    write_capture(&input, FileMeta::new(65535, LinkType::RAW), &frames);

    let policy = FilterPolicy::default().with_blocked(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    let stats = transform_file(&input, &output, policy, 1, &AtomicBool::new(true)).unwrap();
    assert_eq!(stats.written, 1);

    let (meta, records) = read_capture(&output);
    assert_eq!(meta.link_type, LinkType::RAW);
    assert_eq!(records[0].data(), &frames[1][..]);
}

#[test]
fn missing_input_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = transform_file(
        &dir.path().join("missing.pcap"),
        &dir.path().join("out.pcap"),
        FilterPolicy::default(),
        1,
        &AtomicBool::new(true),
    );
    assert!(result.is_err());
}
