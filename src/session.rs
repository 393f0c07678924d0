//! Session type owning the reusable scratch buffers, replacing the
//! teacher's per-`Grib2<R>` stateful reader (REDESIGN FLAGS, spec.md §9:
//! "mutable shared bitmap/buffer growth" should become an
//! ownership-carrying buffer type moved, not aliased, across calls).
//!
//! Grounded on the teacher's `SeekableGrib2Reader` ownership style — a
//! thin newtype around the caller's I/O collaborator — generalized into
//! an edition-agnostic buffer pool since encode and decode no longer
//! share a read cursor the way the teacher's lazy `get_values` does.

/// Owns the input staging and output staging buffers for one stream of
/// messages. Buffers grow monotonically in capacity; they are dropped
/// when the session ends (§5).
#[derive(Debug, Default)]
pub struct CodecSession {
    input_scratch: Vec<u8>,
    output_scratch: Vec<u8>,
}

impl CodecSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a zeroed scratch buffer of at least `len` bytes for
    /// staging one message's input, reusing prior capacity.
    pub fn input_buffer(&mut self, len: usize) -> &mut Vec<u8> {
        if self.input_scratch.len() < len {
            self.input_scratch.resize(len, 0);
        } else {
            self.input_scratch.truncate(len);
        }
        &mut self.input_scratch
    }

    /// Returns an empty scratch buffer (preserving capacity) for staging
    /// one message's output.
    pub fn output_buffer(&mut self) -> &mut Vec<u8> {
        self.output_scratch.clear();
        &mut self.output_scratch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_reuse_capacity_across_calls() {
        let mut session = CodecSession::new();
        session.input_buffer(1024);
        let cap_after_first = session.input_scratch.capacity();
        session.input_buffer(16);
        assert!(session.input_scratch.capacity() >= cap_after_first);
        assert_eq!(session.input_buffer(16).len(), 16);
    }

    #[test]
    fn output_buffer_starts_empty_each_time() {
        let mut session = CodecSession::new();
        session.output_buffer().extend_from_slice(b"abc");
        assert_eq!(session.output_buffer().len(), 0);
    }
}
