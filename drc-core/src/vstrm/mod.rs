//! VSTRM, the video stream transport packet format.
//!
//! | Module    | Purpose                                            |
//! |-----------|----------------------------------------------------|
//! | `packet`  | Fixed-layout header, flags, payload                |
//! | `options` | TLV-style extension options in header bytes 8..16  |

pub mod options;
pub mod packet;

pub use options::{ExtOption, ExtOptions};
pub use packet::{
    FrameRate, MAX_SEQ_ID, MAX_VSTRM_PACKET_SIZE, MAX_VSTRM_PAYLOAD_SIZE, VSTRM_HEADER_SIZE,
    VstrmPacket,
};
