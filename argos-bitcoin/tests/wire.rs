//! Decoding tests against known wire captures.

use argos_bitcoin::{
    Addr, MessageHeader, NetworkMagic, ServiceType, Transaction, Version,
};
use argos_codec::decode;

/// The classic protocol-60002 version announcement, relay flag appended.
fn version_payload() -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend(hex::decode("62ea0000").unwrap()); // version 60002
    payload.extend(hex::decode("0100000000000000").unwrap()); // NODE_NETWORK
    payload.extend(hex::decode("11b2d05000000000").unwrap()); // 2012-12-18
    payload.extend(
        hex::decode("010000000000000000000000000000000000ffff000000000000").unwrap(), // addr_recv
    );
    payload.extend(
        hex::decode("000000000000000000000000000000000000ffff000000000000").unwrap(), // addr_from
    );
    payload.extend(hex::decode("3b2eb35d8ce61765").unwrap()); // nonce
    payload.extend(hex::decode("0f2f5361746f7368693a302e372e322f").unwrap()); // user agent
    payload.extend(hex::decode("c03e0300").unwrap()); // start height 212672
    payload.push(0x01); // relay
    payload
}

#[test]
fn version_frame_header_decodes() {
    let mut header_bytes = Vec::new();
    header_bytes.extend([0xF9, 0xBE, 0xB4, 0xD9]);
    header_bytes.extend(b"version\0\0\0\0\0");
    header_bytes.extend(101u32.to_le_bytes());
    header_bytes.extend([0x35, 0x8D, 0x49, 0x32]);

    let (header, read) = decode::<MessageHeader>(&header_bytes).unwrap();
    assert_eq!(read, MessageHeader::LENGTH);
    assert_eq!(header.magic, NetworkMagic::MAIN);
    assert_eq!(header.command_str(), "version");
    assert_eq!(header.length, 101);
    assert_eq!(header.checksum, 0x3249_8D35);
}

#[test]
fn version_payload_decodes() {
    let payload = version_payload();
    assert_eq!(payload.len(), 101);

    let (version, read) = decode::<Version>(&payload).unwrap();
    assert_eq!(read, payload.len());
    assert_eq!(version.version, 60002);
    assert!(version.services.serves(ServiceType::NETWORK));
    assert_eq!(version.timestamp, 1_355_854_353);
    assert_eq!(version.addr_from.node_addr().to_string(), "0.0.0.0:0");
    assert_eq!(version.nonce, 0x6517_E68C_5DB3_2E3B);
    assert_eq!(version.user_agent.to_string(), "/Satoshi:0.7.2/");
    assert_eq!(version.start_height, 212_672);
    assert!(version.relay);
}

#[test]
fn addr_payload_decodes() {
    let payload = hex::decode(concat!(
        "01",                               // one entry
        "e215104d",                         // time
        "0100000000000000",                 // NODE_NETWORK
        "00000000000000000000ffff0a000001", // ::ffff:10.0.0.1
        "208d",                             // port 8333, network order
    ))
    .unwrap();

    let (addr, read) = decode::<Addr>(&payload).unwrap();
    assert_eq!(read, payload.len());
    assert_eq!(addr.entries.len(), 1);
    assert_eq!(addr.entries[0].time, 0x4D10_15E2);
    assert_eq!(addr.entries[0].node_addr().to_string(), "10.0.0.1:8333");
}

#[test]
fn legacy_transaction_payload_decodes() {
    // one input with a 139-byte script, two outputs with 25-byte scripts
    let mut payload = Vec::new();
    payload.extend(1u32.to_le_bytes());
    payload.push(0x01);
    payload.extend([0x6D; 32]); // previous output hash
    payload.extend(0u32.to_le_bytes());
    payload.push(0x8B);
    payload.extend(vec![0x48; 0x8B]); // signature script
    payload.extend([0xFF, 0xFF, 0xFF, 0xFF]);
    payload.push(0x02);
    payload.extend(5_000_000i64.to_le_bytes());
    payload.push(0x19);
    payload.extend(vec![0x76; 0x19]);
    payload.extend(3_354_000_000i64.to_le_bytes());
    payload.push(0x19);
    payload.extend(vec![0xA9; 0x19]);
    payload.extend(0u32.to_le_bytes());
    assert_eq!(payload.len(), 258);

    let (tx, read) = decode::<Transaction>(&payload).unwrap();
    assert_eq!(read, 258);
    assert_eq!(tx.version, 1);
    assert_eq!(tx.flag, [0, 0]);
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.inputs[0].signature_script.len(), 139);
    assert_eq!(tx.inputs[0].sequence, 0xFFFF_FFFF);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[0].value, 5_000_000);
    assert_eq!(tx.outputs[1].value, 3_354_000_000);
    assert_eq!(tx.lock_time, 0);
}

#[test]
fn truncated_payload_reports_eof() {
    let mut payload = version_payload();
    payload.truncate(40);
    assert!(decode::<Version>(&payload).is_err());
}
