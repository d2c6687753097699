use anyhow::{bail, Context, Result};
use dicom_object::open_file;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::telemetry::mask_patient_id;

/// Offset of the `DICM` magic after the 128-byte preamble.
const DICOM_MAGIC_OFFSET: usize = 128;

/// Image container of a scan file, from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFormat {
    Dicom,
    Png,
    Jpeg,
    Unknown,
}

impl ScanFormat {
    pub fn detect(data: &[u8]) -> Self {
        let magic = b"DICM";
        if data.len() >= DICOM_MAGIC_OFFSET + magic.len()
            && &data[DICOM_MAGIC_OFFSET..DICOM_MAGIC_OFFSET + magic.len()] == magic
        {
            ScanFormat::Dicom
        } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            ScanFormat::Png
        } else if data.starts_with(&[0xff, 0xd8, 0xff]) {
            ScanFormat::Jpeg
        } else {
            ScanFormat::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanFormat::Dicom => "DICOM",
            ScanFormat::Png => "PNG",
            ScanFormat::Jpeg => "JPEG",
            ScanFormat::Unknown => "unknown",
        }
    }
}

/// A scan image read from disk, ready for upload.
#[derive(Debug, Clone)]
pub struct ScanFile {
    pub path: PathBuf,
    pub format: ScanFormat,
    pub bytes: Vec<u8>,
    /// PatientID tag of a DICOM file, when present.
    pub patient_id: Option<String>,
}

/// Read a scan image and, for DICOM files, its PatientID.
pub fn load_scan_file<P: AsRef<Path>>(path: P) -> Result<ScanFile> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read scan file {}", path.display()))?;
    if bytes.is_empty() {
        bail!("Scan file {} is empty", path.display());
    }

    let format = ScanFormat::detect(&bytes);
    if format == ScanFormat::Unknown {
        warn!("Unrecognised image format for {}; uploading as-is", path.display());
    }

    let patient_id = if format == ScanFormat::Dicom {
        match patient_id_from_file(path) {
            Ok(patient_id) => patient_id,
            Err(e) => {
                warn!("Could not read DICOM tags from {}: {:#}", path.display(), e);
                None
            }
        }
    } else {
        None
    };

    info!(
        "Loaded {} scan {} ({} bytes)",
        format.as_str(),
        path.display(),
        bytes.len()
    );

    Ok(ScanFile {
        path: path.to_path_buf(),
        format,
        bytes,
        patient_id,
    })
}

/// PatientID of a DICOM file; `None` when the tag is missing or blank.
pub fn patient_id_from_file<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
    let obj = open_file(path.as_ref()).context("Failed to open DICOM file")?;

    let patient_id = match obj.element_by_name("PatientID") {
        Ok(element) => match element.to_str() {
            Ok(value) => value
                .trim_matches(|c: char| c.is_whitespace() || c == '\0')
                .to_string(),
            Err(_) => String::new(),
        },
        Err(_) => String::new(),
    };

    if patient_id.is_empty() {
        return Ok(None);
    }
    info!("DICOM PatientID found: {}", mask_patient_id(&patient_id));
    Ok(Some(patient_id))
}
