//! Packed bin-group summaries
//!
//! Every spectral sample carries one (HT20) or two (HT20/40) bin-groups
//! after its FFT bins. A bin-group is a 3 byte hardware record holding the
//! peak magnitude, the peak bin position and the histogram bitmap weight
//! of the bins it covers. The layout is identical for "all", "lower" and
//! "upper" bins, so the decoding here is shared by both sample shapes.
//!
//! ```text
//! byte0: {max_magnitude[1:0], bitmap_weight[5:0]}
//! byte1:  max_magnitude[9:2]
//! byte2: {max_index[5:0], max_magnitude[11:10]}
//! ```
use bilge::prelude::*;

/// Length of a bin-group in bytes.
pub const BIN_GROUP_LEN: usize = 3;

/// Offset added to the sign-extended peak index to rebase it onto a bin position.
const MAX_INDEX_BASE: u8 = 29;

/// Bin-group record, fields listed from the least significant bit of byte0
#[bitsize(24)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq, Eq)]
pub struct BinGroup {
    pub weight: u6,         // Histogram bitmap weight
    pub magnitude_low: u2,  // max_magnitude[1:0]
    pub magnitude_mid: u8,  // max_magnitude[9:2]
    pub magnitude_high: u2, // max_magnitude[11:10]
    pub index_offset: u6,   // Peak index relative to the center bin (6 bit signed)
}

/// Summary values of a single bin-group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedBinGroup {
    /// Peak magnitude (12 bit)
    pub max_magnitude: u16,
    /// Position of the peak bin
    pub max_index: u8,
    /// Bitmap weight (6 bit)
    pub bitmap_weight: u8,
}

impl BinGroup {
    /// Build a bin-group from its 3 bytes as they appear in the sample.
    pub fn from_buf(buf: &[u8; BIN_GROUP_LEN]) -> Self {
        let value: UInt<u32, 24> = UInt::<u32, 24>::new(
            (buf[0] as u32) | ((buf[1] as u32) << 8) | ((buf[2] as u32) << 16),
        );
        BinGroup::from(value)
    }

    /// Peak magnitude, stitched together from its three fragments.
    pub fn max_magnitude(&self) -> u16 {
        u16::from(u8::from(self.magnitude_low()))
            | (u16::from(self.magnitude_mid()) << 2)
            | (u16::from(u8::from(self.magnitude_high())) << 10)
    }

    /// Peak bin position.
    ///
    /// The hardware reports the peak as an offset from the center bin. The
    /// offset is sign-extended and rebased by 29. Known to misreport a few
    /// boundary values (a field of 32 is treated as positive, fields of 33
    /// and 34 wrap past 255); consumers of this format expect exactly these
    /// values, so they are kept.
    pub fn max_index(&self) -> u8 {
        let m = u8::from(self.index_offset());
        let m = if m > 32 { m | 0xe0 } else { m & !0xe0 };
        m.wrapping_add(MAX_INDEX_BASE)
    }

    /// Histogram bitmap weight.
    pub fn bitmap_weight(&self) -> u8 {
        u8::from(self.weight())
    }

    pub fn decode(&self) -> DecodedBinGroup {
        DecodedBinGroup {
            max_magnitude: self.max_magnitude(),
            max_index: self.max_index(),
            bitmap_weight: self.bitmap_weight(),
        }
    }
}

/// Grabs the max magnitude from the all/upper/lower bins
pub fn max_magnitude(bins: &[u8; BIN_GROUP_LEN]) -> u16 {
    BinGroup::from_buf(bins).max_magnitude()
}

/// Grabs the max index from the all/upper/lower bins
pub fn max_index(bins: &[u8; BIN_GROUP_LEN]) -> u8 {
    BinGroup::from_buf(bins).max_index()
}

/// Grabs the bitmap weight from the all/upper/lower bins
pub fn bitmap_weight(bins: &[u8; BIN_GROUP_LEN]) -> u8 {
    BinGroup::from_buf(bins).bitmap_weight()
}

/// Decodes all summary values from the all/upper/lower bins
pub fn decode_bin_group(bins: &[u8; BIN_GROUP_LEN]) -> DecodedBinGroup {
    BinGroup::from_buf(bins).decode()
}
