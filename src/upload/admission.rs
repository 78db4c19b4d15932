use std::fmt;

use crate::config::UploadConfig;
use crate::models::UploadFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    TooLarge { max_size: u64 },
    UnsupportedType { accepted: Vec<String> },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooLarge { max_size } => {
                write!(f, "File is larger than {} bytes", max_size)
            }
            RejectReason::UnsupportedType { accepted } => {
                write!(f, "File type must be one of {}", accepted.join(", "))
            }
        }
    }
}

/// One refusal of a dropped file; a file may be refused for several reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file_name: String,
    pub reason: RejectReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.reason)
    }
}

#[derive(Debug, Default)]
pub struct Admission {
    pub accepted: Vec<UploadFile>,
    pub rejections: Vec<Rejection>,
}

impl Admission {
    pub fn messages(&self) -> Vec<String> {
        self.rejections.iter().map(ToString::to_string).collect()
    }
}

/// Size and type limits applied before a file may join a batch.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    max_file_size: u64,
    accepted_types: Vec<String>,
}

impl AdmissionPolicy {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            accepted_types: config.accepted_types.clone(),
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Value for the `accept` attribute of the file input
    pub fn accept_attribute(&self) -> String {
        self.accepted_types.join(",")
    }

    pub fn admit(&self, files: Vec<UploadFile>) -> Admission {
        let mut admission = Admission::default();

        for file in files {
            let reasons = self.check(&file);
            if reasons.is_empty() {
                admission.accepted.push(file);
            } else {
                admission
                    .rejections
                    .extend(reasons.into_iter().map(|reason| Rejection {
                        file_name: file.name.clone(),
                        reason,
                    }));
            }
        }

        admission
    }

    fn check(&self, file: &UploadFile) -> Vec<RejectReason> {
        let mut reasons = Vec::new();
        if file.size() > self.max_file_size {
            reasons.push(RejectReason::TooLarge {
                max_size: self.max_file_size,
            });
        }
        let content_type = file.content_type.to_lowercase();
        if !self.accepted_types.iter().any(|t| t == &content_type) {
            reasons.push(RejectReason::UnsupportedType {
                accepted: self.accepted_types.clone(),
            });
        }
        reasons
    }
}
