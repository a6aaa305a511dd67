/// Decoded 16-bit PCM for one file.
///
/// Owned by the worker encoding that file; dropping it releases the samples.
#[derive(Eq, PartialEq)]
#[derive(Clone)]
#[derive(Debug)]
pub struct PcmBuffer {
    pub left: Vec<i16>,
    pub right: Option<Vec<i16>>,
}

impl PcmBuffer {
    pub fn mono(left: Vec<i16>) -> PcmBuffer {
        PcmBuffer { left, right: None }
    }

    pub fn stereo(left: Vec<i16>, right: Vec<i16>) -> PcmBuffer {
        debug_assert_eq!(left.len(), right.len());
        PcmBuffer { left, right: Some(right) }
    }

    pub fn channels(&self) -> u16 {
        match self.right {
            Some(_) => 2,
            None => 1,
        }
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Interleaves back into `L R L R ...` order, or copies mono as is.
    pub fn interleaved(&self) -> Vec<i16> {
        match &self.right {
            None => self.left.clone(),
            Some(right) => {
                let mut out = Vec::with_capacity(self.left.len() * 2);
                for (l, r) in self.left.iter().zip(right) {
                    out.push(*l);
                    out.push(*r);
                }
                out
            }
        }
    }

    pub fn interleaved_i32(&self) -> Vec<i32> {
        self.interleaved().into_iter().map(i32::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleave_stereo() {
        let pcm = PcmBuffer::stereo(vec![1, 3, 5], vec![2, 4, 6]);
        assert_eq!(pcm.channels(), 2);
        assert_eq!(pcm.frames(), 3);
        assert_eq!(pcm.interleaved(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn interleave_mono_is_identity() {
        let pcm = PcmBuffer::mono(vec![-1, 0, 1]);
        assert_eq!(pcm.channels(), 1);
        assert_eq!(pcm.interleaved_i32(), vec![-1, 0, 1]);
    }
}
