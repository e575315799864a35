//! CRC algorithms used on the Iridium data path.
//!
//! IDA bursts carry CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF, no
//! reflection); ACARS frames carry CRC-16/Kermit (the reflected form of the
//! same polynomial, init 0). Both are "residue zero" checks: folding the
//! stored CRC into the input makes a clean message compute to 0.

use crc::{Algorithm, Crc};

const CRC_CCITT_FALSE: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0xFFFF,
    refin: false,
    refout: false,
    xorout: 0x0,
    check: 0x29B1,
    residue: 0x0,
};

const CRC_KERMIT: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0x0,
    refin: true,
    refout: true,
    xorout: 0x0,
    check: 0x2189,
    residue: 0x0,
};

/// CRC instance for IDA burst verification.
pub const IDA_CRC: Crc<u16> = Crc::<u16>::new(&CRC_CCITT_FALSE);

/// CRC instance for ACARS frame verification.
pub const ACARS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_KERMIT);

/// CRC-16/CCITT-FALSE over `data`.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    IDA_CRC.checksum(data)
}

/// CRC-16/Kermit over `data`.
pub fn crc16_kermit(data: &[u8]) -> u16 {
    ACARS_CRC.checksum(data)
}
