//! Segment descriptor encoding.

use crate::error::{CoreError, CoreResult};

/// Size of the magic field at the end of every descriptor.
pub const MAGIC_SIZE: usize = 4;

/// A decoded descriptor footer, exactly as found on disk.
///
/// No validation happens at decode time; use [`matches`](Self::matches) and
/// [`is_root`](Self::is_root) to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    /// Offset in the protected file the payload was copied from. For the
    /// root sentinel, the original length of the protected file.
    pub source_offset: u64,
    /// Number of payload bytes preceding this footer. For the root
    /// sentinel, equal to the magic.
    pub payload_length: u64,
    /// The magic field.
    pub magic: u32,
}

impl SegmentDescriptor {
    /// Returns `true` if the magic field equals `magic`.
    #[must_use]
    pub const fn matches(&self, magic: u32) -> bool {
        self.magic == magic
    }

    /// Returns `true` if this is a root sentinel for `magic`.
    #[must_use]
    pub const fn is_root(&self, magic: u32) -> bool {
        self.magic == magic && self.payload_length == magic as u64
    }
}

/// Fixed-width big-endian codec for segment descriptors.
///
/// ```text
/// | source_offset (N) | payload_length (N) | magic (4) |
/// ```
///
/// `N` is the link size. All integers are big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentCodec {
    link_size: usize,
    magic: u32,
}

impl SegmentCodec {
    /// Creates a codec for the given link size and magic.
    ///
    /// The link size is not checked here; see
    /// [`JournalConfig::validate`](crate::JournalConfig::validate).
    #[must_use]
    pub const fn new(link_size: usize, magic: u32) -> Self {
        Self { link_size, magic }
    }

    /// Returns the link size in bytes.
    #[must_use]
    pub const fn link_size(&self) -> usize {
        self.link_size
    }

    /// Returns the magic stamped into encoded descriptors.
    #[must_use]
    pub const fn magic(&self) -> u32 {
        self.magic
    }

    /// Returns the encoded width of one descriptor, `2N + 4`.
    #[must_use]
    pub const fn width(&self) -> usize {
        2 * self.link_size + MAGIC_SIZE
    }

    /// Encodes a segment descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LinkOverflow`] if either value needs more than
    /// `link_size` bytes.
    pub fn encode(&self, source_offset: u64, payload_length: u64) -> CoreResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.width());
        self.put_link(&mut out, source_offset)?;
        self.put_link(&mut out, payload_length)?;
        out.extend_from_slice(&self.magic.to_be_bytes());
        Ok(out)
    }

    /// Encodes the root sentinel for a protected file of `original_length`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LinkOverflow`] if `original_length` does not fit.
    pub fn encode_root(&self, original_length: u64) -> CoreResult<Vec<u8>> {
        self.encode(original_length, u64::from(self.magic))
    }

    /// Decodes a descriptor footer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if `bytes` is not exactly
    /// [`width`](Self::width) bytes long.
    pub fn decode(&self, bytes: &[u8]) -> CoreResult<SegmentDescriptor> {
        if bytes.len() != self.width() {
            return Err(CoreError::invalid_format(format!(
                "descriptor must be {} bytes, got {}",
                self.width(),
                bytes.len()
            )));
        }

        let n = self.link_size;
        let source_offset = read_link(&bytes[..n]);
        let payload_length = read_link(&bytes[n..2 * n]);
        let magic = u32::from_be_bytes([
            bytes[2 * n],
            bytes[2 * n + 1],
            bytes[2 * n + 2],
            bytes[2 * n + 3],
        ]);

        Ok(SegmentDescriptor {
            source_offset,
            payload_length,
            magic,
        })
    }

    fn put_link(&self, out: &mut Vec<u8>, value: u64) -> CoreResult<()> {
        let bytes = value.to_be_bytes();
        let skip = bytes.len() - self.link_size;
        if bytes[..skip].iter().any(|&b| b != 0) {
            return Err(CoreError::LinkOverflow {
                value,
                link_size: self.link_size,
            });
        }
        out.extend_from_slice(&bytes[skip..]);
        Ok(())
    }
}

fn read_link(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}
