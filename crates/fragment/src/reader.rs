//! Sample payload reading.

use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;

use crate::{Fragment, ReadError};

/// Read the raw encoded payload of every sample in `fragment` from the
/// source file, in stored (presentation) order.
///
/// Every byte range is validated against the physical file size before any
/// read happens: a persisted index that has outlived its source file (for
/// example after truncation) fails cleanly instead of producing a partial
/// buffer.
pub fn read_samples<R: Read + Seek>(
    fragment: &Fragment,
    src: &mut R,
) -> Result<Vec<Bytes>, ReadError> {
    let file_size = src.seek(SeekFrom::End(0))?;

    for s in &fragment.samples {
        let end = s.offset.checked_add(s.size as u64);
        if end.is_none_or(|end| end > file_size) {
            return Err(ReadError::OutOfBounds {
                offset: s.offset,
                size: s.size,
                file_size,
            });
        }
    }

    let mut buffers = Vec::with_capacity(fragment.samples.len());
    for s in &fragment.samples {
        src.seek(SeekFrom::Start(s.offset))?;
        let mut buf = vec![0u8; s.size as usize];
        src.read_exact(&mut buf)?;
        buffers.push(Bytes::from(buf));
    }
    Ok(buffers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FragmentSample;
    use std::io::Cursor;

    fn fragment_with(samples: Vec<FragmentSample>) -> Fragment {
        Fragment {
            sequence: 1,
            timestamp: 0,
            duration: 600,
            timescale: 600,
            samples,
        }
    }

    fn sample(offset: u64, size: u32) -> FragmentSample {
        FragmentSample {
            track: 0,
            offset,
            size,
            pts: 0,
            dts: 0,
            keyframe: true,
        }
    }

    #[test]
    fn test_reads_samples_in_order() {
        let mut data = vec![0u8; 64];
        data[8..12].copy_from_slice(&[1, 2, 3, 4]);
        data[32..35].copy_from_slice(&[5, 6, 7]);

        let fragment = fragment_with(vec![sample(8, 4), sample(32, 3)]);
        let buffers = read_samples(&fragment, &mut Cursor::new(&data)).unwrap();
        assert_eq!(buffers.len(), 2);
        assert_eq!(&buffers[0][..], &[1, 2, 3, 4]);
        assert_eq!(&buffers[1][..], &[5, 6, 7]);
    }

    #[test]
    fn test_range_beyond_file_size() {
        let data = vec![0u8; 64];
        let fragment = fragment_with(vec![sample(8, 4), sample(60, 8)]);
        let err = read_samples(&fragment, &mut Cursor::new(&data)).unwrap_err();
        assert!(matches!(
            err,
            ReadError::OutOfBounds {
                offset: 60,
                size: 8,
                file_size: 64
            }
        ));
    }

    #[test]
    fn test_no_partial_output_on_stale_index() {
        // The first sample is valid, the second is not; nothing is read.
        let data = vec![0u8; 16];
        let fragment = fragment_with(vec![sample(0, 16), sample(16, 1)]);
        assert!(read_samples(&fragment, &mut Cursor::new(&data)).is_err());
    }

    #[test]
    fn test_empty_fragment_reads_nothing() {
        let fragment = fragment_with(vec![]);
        let buffers = read_samples(&fragment, &mut Cursor::new(&[0u8; 4])).unwrap();
        assert!(buffers.is_empty());
    }
}
