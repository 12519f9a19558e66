use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::delta::Instruction;
use crate::error::CodecError;

/// Applies `instructions` to `target_path`, writing the result to
/// `target_path.patched` and atomically renaming it over `target_path` once
/// every instruction has been written.
///
/// The rename is the sole commit point: a crash at any earlier point leaves
/// the original `target_path` untouched (plus a stray `.patched` file that a
/// later pass can remove); nothing is ever left half-written under the
/// original name.
///
/// # Errors
///
/// Returns [`CodecError::Read`] if `target_path` cannot be opened for
/// reading a `Copy` source, and [`CodecError::Write`] if the patched output
/// cannot be created, written, or renamed into place.
pub fn apply_patch(
    target_path: &Path,
    instructions: &[Instruction],
    block_size: u32,
) -> Result<(), CodecError> {
    let block_size = block_size.max(1) as usize;
    let patched_path = patched_path_for(target_path);

    let mut input = File::open(target_path).map_err(|source| CodecError::Read {
        path: target_path.to_path_buf(),
        source,
    })?;
    let mut output = File::create(&patched_path).map_err(|source| CodecError::Write {
        path: patched_path.clone(),
        source,
    })?;

    let mut buffer = vec![0u8; block_size];
    for instruction in instructions {
        match instruction {
            Instruction::Literal { bytes, .. } => {
                output.write_all(bytes).map_err(|source| CodecError::Write {
                    path: patched_path.clone(),
                    source,
                })?;
            }
            Instruction::Copy { source_offset } => {
                input
                    .seek(SeekFrom::Start(*source_offset))
                    .map_err(|source| CodecError::Read {
                        path: target_path.to_path_buf(),
                        source,
                    })?;
                let n = read_up_to(&mut input, &mut buffer, target_path)?;
                output
                    .write_all(&buffer[..n])
                    .map_err(|source| CodecError::Write {
                        path: patched_path.clone(),
                        source,
                    })?;
            }
        }
    }

    output.flush().map_err(|source| CodecError::Write {
        path: patched_path.clone(),
        source,
    })?;
    drop(output);
    drop(input);

    fs::rename(&patched_path, target_path).map_err(|source| CodecError::Write {
        path: target_path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Path used for the in-progress patch output, per spec §6's on-disk layout.
#[must_use]
pub fn patched_path_for(target_path: &Path) -> PathBuf {
    let mut name = target_path.as_os_str().to_owned();
    name.push(".patched");
    PathBuf::from(name)
}

fn read_up_to(file: &mut File, buf: &mut [u8], path: &Path) -> Result<usize, CodecError> {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(CodecError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    #[test]
    fn crash_before_rename_leaves_original_untouched() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("f");
        fs::write(&target, b"original").unwrap();

        // Simulate a crash between the last write and the rename: write the
        // patched file by hand and stop short of calling apply_patch's
        // rename step.
        let patched = patched_path_for(&target);
        let mut out = File::create(&patched).unwrap();
        out.write_all(b"partially written").unwrap();
        drop(out);

        let original = fs::read(&target).unwrap();
        assert_eq!(original, b"original");
        assert!(patched.exists());
    }

    #[test]
    fn patch_commits_via_rename() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("f");
        fs::write(&target, b"abcdefgh").unwrap();

        let instructions = vec![
            Instruction::Literal {
                offset_hint: 0,
                bytes: b"XY".to_vec(),
            },
            Instruction::Copy { source_offset: 4 },
        ];
        apply_patch(&target, &instructions, 4).unwrap();

        let result = fs::read(&target).unwrap();
        assert_eq!(result, b"XYefgh");
        assert!(!patched_path_for(&target).exists());
    }
}
