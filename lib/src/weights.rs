//! Reading and writing the weight blob.
//!
//! The blob is a bincode encoded [`WeightFile`]. It carries a format version
//! and the shape constants it was trained with, so a file written by a
//! differently configured build is rejected instead of silently misread.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ai::lstm::Parameters;
use crate::{MindReaderError, CLASSES, HIDDEN_SIZE, WINDOW_SIZE};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct WeightFile {
    version: u32,
    window_size: u32,
    classes: u32,
    hidden_size: u32,
    parameters: Parameters,
}

pub fn to_bytes(params: &Parameters) -> Result<Vec<u8>, MindReaderError> {
    let file = WeightFile {
        version: FORMAT_VERSION,
        window_size: WINDOW_SIZE as u32,
        classes: CLASSES as u32,
        hidden_size: HIDDEN_SIZE as u32,
        parameters: params.clone(),
    };
    Ok(bincode::serialize(&file)?)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Parameters, MindReaderError> {
    let file: WeightFile = bincode::deserialize(bytes)?;
    if file.version != FORMAT_VERSION {
        return Err(MindReaderError::UnsupportedWeightVersion(file.version));
    }
    let shape = (file.window_size, file.classes, file.hidden_size);
    let expected = (WINDOW_SIZE as u32, CLASSES as u32, HIDDEN_SIZE as u32);
    if shape != expected || !file.parameters.has_expected_shape() {
        return Err(MindReaderError::WeightShapeMismatch {
            found: format!("{:?}", shape),
            expected: format!("{:?}", expected),
        });
    }
    Ok(file.parameters)
}

pub fn load(path: impl AsRef<Path>) -> Result<Parameters, MindReaderError> {
    let bytes = fs::read(path)?;
    from_bytes(&bytes)
}

/// Writes the weights to `path`, creating missing parent directories.
pub fn save(params: &Parameters, path: impl AsRef<Path>) -> Result<(), MindReaderError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_bytes(params)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn weights_survive_a_file_round_trip() {
        let params = Parameters::random(&mut StdRng::seed_from_u64(1));
        let dir = std::env::temp_dir().join(format!("mindreader-weights-{}", std::process::id()));
        let path = dir.join("nested").join("brain.bin");

        save(&params, &path).unwrap();
        assert_eq!(load(&path).unwrap(), params);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load("/this/path/does/not/exist/brain.bin");
        assert!(matches!(result, Err(MindReaderError::WeightIo(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(from_bytes(b"definitely not a weight file").is_err());
        assert!(from_bytes(&[]).is_err());
    }

    #[test]
    fn other_version_is_rejected() {
        let mut bytes = to_bytes(&Parameters::zeros()).unwrap();
        // The version is the first field, a little endian u32.
        bytes[0] = 7;
        assert!(matches!(
            from_bytes(&bytes),
            Err(MindReaderError::UnsupportedWeightVersion(7))
        ));
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let mut params = Parameters::zeros();
        params.b_out.push(0.0);
        let bytes = to_bytes(&params).unwrap();
        assert!(matches!(
            from_bytes(&bytes),
            Err(MindReaderError::WeightShapeMismatch { .. })
        ));
    }
}
