// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// On-device OCR backed by `ocrs`, a pure-Rust engine whose detection and
// recognition networks run on `rten`.
//
// Only available with the `ocr` feature. The two model files
// (`text-detection.rten`, `text-recognition.rten`) are looked up in
// `$XDG_CACHE_HOME/ocrs` (or `~/.cache/ocrs`), which is where `ocrs-cli`
// downloads them on first run.
//
// `ocrs` ships Latin-script models only, so every recognition reports `en`
// as the language used regardless of the hint.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use pagekeep_core::error::PagekeepError;
use rten::Model;
use tracing::{debug, info, instrument, warn};

use super::{LanguageHint, Recognition, TextRecognizer};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";
const MODEL_LANGUAGE: &str = "en";

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expect both model files inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<(), PagekeepError> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(PagekeepError::OcrError(format!(
                    "model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// `ocrs`-backed [`TextRecognizer`]. Model loading is the expensive part;
/// build one engine and reuse it for every page.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self, PagekeepError> {
        config.validate()?;

        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                PagekeepError::OcrError(format!("failed to load model {}: {}", path.display(), err))
            })
        };
        let detection_model = load(&config.detection_model_path)?;
        let recognition_model = load(&config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| PagekeepError::OcrError(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }

    pub fn with_defaults() -> Result<Self, PagekeepError> {
        Self::new(OcrConfig::default())
    }
}

impl TextRecognizer for OcrEngine {
    /// Recognise every text line on the page.
    ///
    /// Confidence is the percentage of detected text lines that produced a
    /// transcription.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(
        &self,
        image: &DynamicImage,
        language: &LanguageHint,
    ) -> Result<Recognition, PagekeepError> {
        if let Some(primary) = language.primary()
            && primary != MODEL_LANGUAGE
        {
            warn!(requested = %primary, "Only Latin-script models are available; using {MODEL_LANGUAGE}");
        }

        let started = Instant::now();
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            PagekeepError::OcrError(format!("bad image source ({}x{}): {}", width, height, err))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| PagekeepError::OcrError(format!("preprocessing failed: {}", err)))?;

        let words = self
            .engine
            .detect_words(&input)
            .map_err(|err| PagekeepError::OcrError(format!("word detection failed: {}", err)))?;
        let lines = self.engine.find_text_lines(&input, &words);
        let recognized = self
            .engine
            .recognize_text(&input, &lines)
            .map_err(|err| PagekeepError::OcrError(format!("line recognition failed: {}", err)))?;

        let detected = recognized.len();
        let texts: Vec<String> = recognized
            .iter()
            .flatten()
            .map(|line| line.to_string())
            .filter(|text| !text.trim().is_empty())
            .collect();

        let confidence = if detected == 0 {
            0.0
        } else {
            texts.len() as f32 * 100.0 / detected as f32
        };
        debug!(detected, recognized = texts.len(), confidence, "OCR complete");

        Ok(Recognition {
            text: texts.join("\n"),
            confidence,
            elapsed: started.elapsed(),
            language: MODEL_LANGUAGE.to_string(),
        })
    }
}
