//! LCW pretty-printer.
//!
//! Deterministic rendering of the decoded LCW into the fixed-width header
//! used by the parsed output lines: `LCW(ft,T:<type>,C:<code>,<remain>)`
//! padded right to 110 characters plus one trailing space.

use std::ops::Range;

use super::Lcw;

fn lcw3_bit_array(val: u32) -> [u8; 21] {
    let mut out = [0u8; 21];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((val >> (20 - i)) & 1) as u8;
    }
    out
}

fn field(bits: &[u8; 21], r: Range<usize>) -> u32 {
    bits[r].iter().fold(0u32, |acc, &b| (acc << 1) | b as u32)
}

fn bit_char(b: u8) -> char {
    char::from(b'0' + b)
}

fn bit_str(bits: &[u8]) -> String {
    bits.iter().map(|&b| bit_char(b)).collect()
}

/// Format the 110-character LCW header (plus trailing space).
pub fn format_lcw_header(lcw: &Lcw) -> String {
    let b = lcw3_bit_array(lcw.lcw3_val);

    let (ty, code, remain) = match lcw.lcw_ft {
        0 => {
            let ty = "maint";
            match lcw.lcw_code {
                0 => {
                    let status = b[1];
                    let dtoa = field(&b, 3..13);
                    let dfoa = field(&b, 13..21);
                    (
                        ty,
                        format!("sync[status:{status},dtoa:{dtoa},dfoa:{dfoa}]"),
                        format!("{}|{}", bit_char(b[0]), bit_char(b[2])),
                    )
                }
                1 => {
                    let dtoa = field(&b, 3..13);
                    let dfoa = field(&b, 13..21);
                    (
                        ty,
                        format!("switch[dtoa:{dtoa},dfoa:{dfoa}]"),
                        bit_str(&b[..3]),
                    )
                }
                3 => {
                    let lqi = b[1] * 2 + b[2];
                    let power = field(&b, 3..6);
                    let f_dtoa = field(&b, 6..13);
                    let f_dfoa = field(&b, 13..20);
                    (
                        ty,
                        format!("maint[2][lqi:{lqi},power:{power},f_dtoa:{f_dtoa},f_dfoa:{f_dfoa}]"),
                        format!("{}|{}", bit_char(b[0]), bit_char(b[20])),
                    )
                }
                6 => (ty, "geoloc".to_string(), bit_str(&b)),
                12 => {
                    let lqi = b[19] * 2 + b[20];
                    let power = field(&b, 16..19);
                    (
                        ty,
                        format!("maint[1][lqi:{lqi},power:{power}]"),
                        bit_str(&b[..16]),
                    )
                }
                15 => (ty, "<silent>".to_string(), bit_str(&b)),
                other => (ty, format!("rsrvd({other})"), bit_str(&b)),
            }
        }
        1 => {
            let ty = "acchl";
            if lcw.lcw_code == 1 {
                let msg_type = field(&b, 1..4);
                let bloc_num = b[4];
                let sapi_code = field(&b, 5..8);
                let segm = bit_str(&b[8..16]);
                let tail = field(&b, 16..21);
                (
                    ty,
                    format!(
                        "acchl[msg_type:{msg_type:01x},bloc_num:{bloc_num:01x},sapi_code:{sapi_code:01x},segm_list:{segm}]"
                    ),
                    format!("{},{tail:02x}", bit_char(b[0])),
                )
            } else {
                (ty, format!("rsrvd({})", lcw.lcw_code), bit_str(&b))
            }
        }
        2 => {
            let ty = "hndof";
            match lcw.lcw_code {
                3 => {
                    let cand = if b[2] == 0 { 'P' } else { 'S' };
                    let denied = b[3];
                    let reference = b[4];
                    let slot = 1 + b[6] * 2 + b[7];
                    let sband_up = field(&b, 8..13);
                    let sband_dn = field(&b, 13..18);
                    let access = field(&b, 18..21) + 1;
                    (
                        ty,
                        format!(
                            "handoff_resp[cand:{cand},denied:{denied},ref:{reference},slot:{slot},sband_up:{sband_up},sband_dn:{sband_dn},access:{access}]"
                        ),
                        format!("{},{}", bit_str(&b[..2]), bit_char(b[5])),
                    )
                }
                12 => (
                    ty,
                    "handoff_cand".to_string(),
                    format!("{},{}", bit_str(&b[..11]), bit_str(&b[11..21])),
                ),
                15 => (ty, "<silent>".to_string(), bit_str(&b)),
                other => (ty, format!("rsrvd({other})"), bit_str(&b)),
            }
        }
        _ => ("rsrvd", format!("<{}>", lcw.lcw_code), bit_str(&b)),
    };

    let raw = format!("LCW({},T:{ty},C:{code},{remain})", lcw.ft);
    format!("{raw:<110} ")
}
