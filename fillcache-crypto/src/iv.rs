//! Initialization vectors.

use std::io::Read;

use rand::rngs::OsRng;
use rand::RngCore;

use fillcache_core::constants::IV_SIZE;
use fillcache_core::error::Result;

/// Generates a random IV from the operating system RNG.
pub fn generate_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Reads a one-block IV prefix from `input`.
pub fn read_iv<R: Read>(input: &mut R) -> Result<[u8; IV_SIZE]> {
    let mut iv = [0u8; IV_SIZE];
    input.read_exact(&mut iv)?;
    Ok(iv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fillcache_core::FillcacheError;

    #[test]
    fn test_generated_ivs_differ() {
        assert_ne!(generate_iv(), generate_iv());
    }

    #[test]
    fn test_read_iv_consumes_one_block() {
        let data: Vec<u8> = (0..20).collect();
        let mut input = data.as_slice();
        let iv = read_iv(&mut input).unwrap();
        assert_eq!(&iv[..], &data[..IV_SIZE]);
        assert_eq!(input, &data[IV_SIZE..]);
    }

    #[test]
    fn test_read_iv_short_input() {
        let mut input: &[u8] = &[1, 2, 3];
        assert!(matches!(read_iv(&mut input), Err(FillcacheError::IoError(_))));
    }
}
