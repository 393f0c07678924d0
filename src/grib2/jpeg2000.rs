//! JPEG 2000 collaborator shim (spec.md §6.5, §4.J), grounded on the
//! teacher's `src/decoder/jpeg2000/{decoder,ext,image,stream}.rs` and its
//! `jpeg2000-unpack-with-openjpeg` feature gating `openjpeg-sys`.

use crate::error::GribError;

/// Decodes a JPEG 2000 code stream starting at `payload`'s first byte
/// into a row-major stream of grayscale integer samples.
#[cfg(feature = "jpeg2000")]
pub fn jpeg2000_decode(payload: &[u8], width: u32, height: u32) -> Result<Vec<u32>, GribError> {
    openjpeg::decode_grayscale(payload, width, height)
}

#[cfg(not(feature = "jpeg2000"))]
pub fn jpeg2000_decode(_payload: &[u8], _width: u32, _height: u32) -> Result<Vec<u32>, GribError> {
    Err(GribError::UnsupportedDataTemplate(40))
}

#[cfg(feature = "jpeg2000")]
mod openjpeg {
    use super::GribError;
    use openjpeg_sys as opj;
    use std::os::raw::c_void;
    use std::ptr::{self, NonNull};

    /// A read-only cursor over the DS payload, fed to `opj_stream_t`
    /// through its C read callback — the same shape as the teacher's
    /// `ext.rs::Stream::from_bytes`, minus skip/seek (the decoder only
    /// ever reads forward over a fully-buffered code stream).
    struct SliceWithOffset<'a> {
        buf: &'a [u8],
        offset: usize,
    }

    unsafe extern "C" fn free_user_data_fn(p_user_data: *mut c_void) {
        drop(unsafe { Box::from_raw(p_user_data as *mut SliceWithOffset) })
    }

    unsafe extern "C" fn read_fn(
        p_buffer: *mut c_void,
        p_nb_bytes: usize,
        p_user_data: *mut c_void,
    ) -> usize {
        if p_buffer.is_null() {
            return 0;
        }
        let user_data = unsafe { &mut *(p_user_data as *mut SliceWithOffset) };
        let bytes_left = user_data.buf.len() - user_data.offset;
        let bytes_read = bytes_left.min(p_nb_bytes);
        let slice = &user_data.buf[user_data.offset..user_data.offset + bytes_read];
        unsafe { ptr::copy_nonoverlapping(slice.as_ptr(), p_buffer as *mut u8, bytes_read) };
        user_data.offset += bytes_read;
        bytes_read
    }

    struct Stream(*mut opj::opj_stream_t);

    impl Drop for Stream {
        fn drop(&mut self) {
            unsafe { opj::opj_stream_destroy(self.0) };
        }
    }

    impl Stream {
        fn from_bytes(buf: &[u8]) -> Result<Self, GribError> {
            let buf_len = buf.len();
            let user_data = Box::new(SliceWithOffset { buf, offset: 0 });
            let ptr = unsafe {
                let stream = opj::opj_stream_default_create(1);
                if stream.is_null() {
                    return Err(GribError::UnsupportedDataTemplate(40));
                }
                opj::opj_stream_set_read_function(stream, Some(read_fn));
                opj::opj_stream_set_user_data_length(stream, buf_len as u64);
                opj::opj_stream_set_user_data(
                    stream,
                    Box::into_raw(user_data) as *mut c_void,
                    Some(free_user_data_fn),
                );
                stream
            };
            Ok(Self(ptr))
        }
    }

    struct Codec(NonNull<opj::opj_codec_t>);

    impl Drop for Codec {
        fn drop(&mut self) {
            unsafe { opj::opj_destroy_codec(self.0.as_ptr()) };
        }
    }

    impl Codec {
        fn j2k() -> Result<Self, GribError> {
            NonNull::new(unsafe { opj::opj_create_decompress(opj::OPJ_CODEC_FORMAT::OPJ_CODEC_J2K) })
                .map(Self)
                .ok_or(GribError::UnsupportedDataTemplate(40))
        }
    }

    struct Image(NonNull<opj::opj_image_t>);

    impl Drop for Image {
        fn drop(&mut self) {
            unsafe { opj::opj_image_destroy(self.0.as_ptr()) };
        }
    }

    pub fn decode_grayscale(payload: &[u8], _width: u32, _height: u32) -> Result<Vec<u32>, GribError> {
        let stream = Stream::from_bytes(payload)?;
        let codec = Codec::j2k()?;

        let mut params: opj::opj_dparameters = unsafe { std::mem::zeroed() };
        unsafe { opj::opj_set_default_decoder_parameters(&mut params) };
        if unsafe { opj::opj_setup_decoder(codec.0.as_ptr(), &mut params) } != 1 {
            return Err(GribError::UnsupportedDataTemplate(40));
        }

        let mut raw_image: *mut opj::opj_image_t = ptr::null_mut();
        if unsafe { opj::opj_read_header(stream.0, codec.0.as_ptr(), &mut raw_image) } != 1 {
            return Err(GribError::UnsupportedDataTemplate(40));
        }
        let image = Image(NonNull::new(raw_image).ok_or(GribError::UnsupportedDataTemplate(40))?);

        if unsafe { opj::opj_decode(codec.0.as_ptr(), stream.0, image.0.as_ptr()) } != 1 {
            return Err(GribError::UnsupportedDataTemplate(40));
        }

        let img = unsafe { image.0.as_ref() };
        if img.numcomps != 1 {
            return Err(GribError::UnsupportedDataTemplate(40));
        }
        let comp = unsafe { &*img.comps };
        let n = (comp.w * comp.h) as usize;
        let data = unsafe { std::slice::from_raw_parts(comp.data, n) };
        Ok(data.iter().map(|&v| v as u32).collect())
    }
}

#[cfg(all(test, not(feature = "jpeg2000")))]
mod tests {
    use super::*;

    #[test]
    fn without_the_feature_decode_fails_distinguishably() {
        let err = jpeg2000_decode(&[], 1, 1).unwrap_err();
        assert_eq!(err, GribError::UnsupportedDataTemplate(40));
    }
}
