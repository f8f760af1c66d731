use crate::types::NetworkMagic;

// start bytes of the known magic arrangements, in track order:
// 0xF9 (main/namecoin), 0xFA (testnet), 0x0B (testnet3), 0x0A (signet)
const STARTS: [u8; 4] = [0xF9, 0xFA, 0x0B, 0x0A];

// second and third byte per track
const TRANS: [[u8; 4]; 2] = [[0xBE, 0xBF, 0x11, 0x03], [0xB4, 0xB5, 0x09, 0xCF]];

/// Byte-at-a-time scanner locating the next network magic in a stream of
/// unknown alignment.
///
/// There are five valid arrangements:
///
/// ```text
/// F9 BE B4 D9   main
/// F9 BE B4 FE   namecoin
/// FA BF B5 DA   testnet
/// 0B 11 09 07   testnet3
/// 0A 03 CF 40   signet
/// ```
///
/// Main and namecoin share their first three bytes; the recorded start
/// track disambiguates the rest and keeps a cross-bred arrangement such as
/// `F9 BE B4 DA` from being accepted. A start byte resets the scan no
/// matter the current state, so a stray start inside a garbled region still
/// aligns to the next candidate frame.
#[derive(Debug, Default)]
pub struct MagicSeeker {
    // 0 is the seek state; n > 0 means n bytes of an arrangement were seen
    state: usize,
    track: usize,
}

impl MagicSeeker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte; returns the magic once a full arrangement was seen.
    pub fn feed(&mut self, byte: u8) -> Option<NetworkMagic> {
        if let Some(track) = STARTS.iter().position(|b| *b == byte) {
            self.state = 1;
            self.track = track;
            return None;
        }

        if self.state == 3 {
            self.state = 0;
            return match (self.track, byte) {
                (0, 0xD9) => Some(NetworkMagic::MAIN),
                (0, 0xFE) => Some(NetworkMagic::NAMECOIN),
                (1, 0xDA) => Some(NetworkMagic::TESTNET),
                (2, 0x07) => Some(NetworkMagic::TESTNET3),
                (3, 0x40) => Some(NetworkMagic::SIGNET),
                _ => None,
            };
        }

        if self.state > 0 {
            if TRANS[self.state - 1][self.track] == byte {
                self.state += 1;
            } else {
                self.state = 0;
            }
        }

        None
    }
}

/// Runs a fresh seeker over `bytes`, returning the magic and the count of
/// consumed bytes when one is found.
pub fn seek_magic(bytes: &[u8]) -> Option<(NetworkMagic, usize)> {
    let mut seeker = MagicSeeker::new();
    for (index, byte) in bytes.iter().enumerate() {
        if let Some(magic) = seeker.feed(*byte) {
            return Some((magic, index + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_network_magic_is_recognized() {
        let cases: [(&[u8], NetworkMagic); 5] = [
            (&[0xF9, 0xBE, 0xB4, 0xD9], NetworkMagic::MAIN),
            (&[0xF9, 0xBE, 0xB4, 0xFE], NetworkMagic::NAMECOIN),
            (&[0xFA, 0xBF, 0xB5, 0xDA], NetworkMagic::TESTNET),
            (&[0x0B, 0x11, 0x09, 0x07], NetworkMagic::TESTNET3),
            (&[0x0A, 0x03, 0xCF, 0x40], NetworkMagic::SIGNET),
        ];

        for (bytes, expected) in cases {
            assert_eq!(seek_magic(bytes), Some((expected, 4)), "{expected}");
        }
    }

    #[test]
    fn garbage_prefix_is_skipped() {
        let stream = [0x00, 0xF9, 0xBE, 0xB4, 0xD9, 0x76, 0x65];
        assert_eq!(seek_magic(&stream), Some((NetworkMagic::MAIN, 5)));

        let noisy = [0x13, 0x37, 0xBE, 0xB4, 0x0B, 0x11, 0x09, 0x07];
        assert_eq!(seek_magic(&noisy), Some((NetworkMagic::TESTNET3, 8)));
    }

    #[test]
    fn cross_track_ending_is_rejected() {
        // main's prefix with testnet's last byte never parses
        assert_eq!(seek_magic(&[0xF9, 0xBE, 0xB4, 0xDA]), None);
        assert_eq!(seek_magic(&[0xFA, 0xBF, 0xB5, 0xD9]), None);
    }

    #[test]
    fn a_start_byte_restarts_the_scan() {
        // the second 0xF9 begins a fresh arrangement
        let stream = [0xF9, 0xBE, 0xF9, 0xBE, 0xB4, 0xD9];
        assert_eq!(seek_magic(&stream), Some((NetworkMagic::MAIN, 6)));

        // a start byte in the ending position restarts instead of failing
        let stream = [0xF9, 0xBE, 0xB4, 0xFA, 0xBF, 0xB5, 0xDA];
        assert_eq!(seek_magic(&stream), Some((NetworkMagic::TESTNET, 7)));
    }

    #[test]
    fn mismatches_fall_back_to_seeking() {
        let mut seeker = MagicSeeker::new();
        for byte in [0xF9, 0xBE, 0x00, 0xB4, 0xD9] {
            assert_eq!(seeker.feed(byte), None);
        }
        // the machine recovered and still accepts a clean arrangement
        for byte in [0xF9, 0xBE, 0xB4] {
            assert_eq!(seeker.feed(byte), None);
        }
        assert_eq!(seeker.feed(0xD9), Some(NetworkMagic::MAIN));
    }
}
