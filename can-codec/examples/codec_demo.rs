//! Standalone codec demo
//!
//! Loads a small inline DBC schema, encodes a few frames (with automatic
//! checksum/counter derivation), corrupts one of them, and shows how strict
//! and non-strict decoding treat it.
//!
//! Usage:
//!   cargo run --example codec_demo

use can_codec::{CodecError, Decoder, Encoder, SignalDatabase, SignalValues};

const DEMO_DBC: &str = r#"
BO_ 512 SpeedMsg: 8 ECU1
 SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] "km/h" Dash
 SG_ Odometer : 16|24@1+ (0.1,0) [0|1677721.5] "km" Dash

BO_ 299 SteerCmd: 8 ECU1
 SG_ CHECKSUM : 0|8@1+ (1,0) [0|255] "" ECU2
 SG_ COUNTER : 8|4@1+ (1,0) [0|15] "" ECU2
 SG_ SteerTorque : 16|12@1- (0.1,0) [-204.8|204.7] "Nm" ECU2

BA_ "ChecksumKind" BO_ 299 "crc8_h2f";
"#;

fn main() {
    env_logger::init();

    let db = SignalDatabase::from_dbc_str(DEMO_DBC).expect("demo schema must load");
    let stats = db.stats();
    println!(
        "Loaded schema: {} messages, {} signals",
        stats.num_messages, stats.num_signals
    );

    let mut encoder = Encoder::new(&db).with_strict(true);
    let mut strict_decoder = Decoder::new(&db).with_strict(true);
    let mut lax_decoder = Decoder::new(&db);

    // Plain message round trip
    let mut values = SignalValues::new();
    values.insert("Speed".to_string(), 100.0);
    values.insert("Odometer".to_string(), 42_123.4);
    let data = encoder.encode(0x200, &values).expect("encode SpeedMsg");
    println!("\nSpeedMsg encoded: {:02X?}", data);
    let frame = strict_decoder.decode(0x200, &data).expect("decode SpeedMsg");
    println!("SpeedMsg decoded: {:?}", frame.signals);

    // Derived checksum/counter: encode twice, watch the counter advance
    let mut values = SignalValues::new();
    values.insert("SteerTorque".to_string(), -12.3);
    for _ in 0..2 {
        let data = encoder.encode(299, &values).expect("encode SteerCmd");
        println!("\nSteerCmd encoded:  {:02X?}", data);
        let frame = strict_decoder.decode(299, &data).expect("decode SteerCmd");
        println!(
            "SteerCmd decoded:  torque={:.1} counter={} checksum={}",
            frame.get("SteerTorque").unwrap(),
            frame.get("COUNTER").unwrap(),
            frame.get("CHECKSUM").unwrap()
        );
    }

    // Corrupt a payload byte: strict decode drops the frame, lax does not
    let mut data = encoder.encode(299, &values).expect("encode SteerCmd");
    data[2] ^= 0x08;
    match strict_decoder.decode(299, &data) {
        Err(CodecError::Integrity { check, .. }) => {
            println!("\nCorrupted frame rejected by strict decode ({} mismatch)", check)
        }
        other => println!("\nunexpected strict decode result: {:?}", other),
    }
    let frame = lax_decoder.decode(299, &data).expect("lax decode");
    println!(
        "Same frame in non-strict decode yields torque={:.1} (unvalidated)",
        frame.get("SteerTorque").unwrap()
    );
}
