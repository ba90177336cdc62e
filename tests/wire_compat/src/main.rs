fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{self, IoSlice};
    use std::path::PathBuf;
    use std::sync::Mutex;

    use dltrouter_dlt_channel::{ChannelConfig, DatagramSender, DltLogChannel};
    use dltrouter_protocol::{DltId, FileTransferEntry, decode_entry, encode_entry};
    use dltrouter_router::{RecordKind, encode_frame};
    use dltrouter_transfer::{Packet, PacketLevel};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a hex fixture, ignoring surrounding whitespace.
    fn load_fixture(name: &str) -> Vec<u8> {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        hex::decode(data.trim())
            .unwrap_or_else(|e| panic!("failed to decode fixture {}: {e}", path.display()))
    }

    fn assert_bytes(name: &str, actual: &[u8]) {
        let expected = load_fixture(name);
        assert_eq!(
            hex::encode(actual),
            hex::encode(&expected),
            "byte mismatch for {name}"
        );
    }

    fn sample_entry() -> FileTransferEntry {
        FileTransferEntry::new(
            DltId::new("APP1").unwrap(),
            DltId::new("FT").unwrap(),
            "/tmp/trace.bin",
            true,
        )
    }

    /// Collects datagrams into a caller-owned list.
    struct Capture<'a>(&'a Mutex<Vec<Vec<u8>>>);

    impl DatagramSender for Capture<'_> {
        fn send(&self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
            let datagram: Vec<u8> = bufs.iter().flat_map(|b| b.iter().copied()).collect();
            let len = datagram.len();
            self.0.lock().unwrap().push(datagram);
            Ok(len)
        }
    }

    fn packet(payload: &[u8], level: PacketLevel, sequence_number: u32) -> Packet<'_> {
        Packet {
            payload,
            level,
            appid: DltId::new("APP1").unwrap(),
            ctxid: DltId::new("FT").unwrap(),
            sequence_number,
            timestamp: 100,
        }
    }

    /// Sends `packets` through a fresh channel and returns the datagrams.
    fn frame_all(packets: &[Packet<'_>]) -> Vec<Vec<u8>> {
        let datagrams = Mutex::new(Vec::new());
        let channel = DltLogChannel::new(
            Capture(&datagrams),
            ChannelConfig {
                burst_count: 0,
                ..ChannelConfig::default()
            },
        );
        for p in packets {
            channel.send_packet(p).unwrap();
        }
        assert_eq!(channel.stats().messages, packets.len() as u64);
        drop(channel);
        datagrams.into_inner().unwrap()
    }

    // --- File transfer entry ---

    #[test]
    fn fixture_file_transfer_entry() {
        let encoded = encode_entry(&sample_entry()).unwrap();
        assert_bytes("file_transfer_entry_v1.hex", &encoded);

        let decoded = decode_entry(&load_fixture("file_transfer_entry_v1.hex")).unwrap();
        assert_eq!(decoded, sample_entry());
    }

    #[test]
    fn fixture_router_frame() {
        let body = encode_entry(&sample_entry()).unwrap();
        let frame = encode_frame(RecordKind::FileTransfer, &body).unwrap();
        assert_bytes("router_frame_file_transfer.hex", &frame);
    }

    // --- DLT messages ---

    #[test]
    fn fixture_dlt_packets() {
        let datagrams = frame_all(&[
            packet(b"abc", PacketLevel::Info, 5),
            packet(b"x", PacketLevel::Error, 1),
        ]);
        assert_bytes("dlt_info_packet.hex", &datagrams[0]);
        assert_bytes("dlt_error_packet.hex", &datagrams[1]);
    }

    #[test]
    fn dlt_length_field_matches_datagram() {
        for name in ["dlt_info_packet.hex", "dlt_error_packet.hex"] {
            let bytes = load_fixture(name);
            let len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
            assert_eq!(len, bytes.len(), "{name}");
        }
    }
}
