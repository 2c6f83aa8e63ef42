use anyhow::{Context, Result, anyhow};
use log::{debug, error, info, warn};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::active;
use crate::app_config::Config;
use crate::engine::{Transcriber, WhisperCppEngine};
use crate::errors::CaptionError;
use crate::file_utils::{FileManager, FileType, PAGES_SUFFIX};
use crate::pages::{self, Page};
use crate::subtitle_processor::{self, parse_srt};
use crate::timestamp;
use crate::transcription;

// @module: Application controller for caption file pipelines

/// Main application controller: moves data between files and the caption core
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Files the folder walk never treats as input, canonicalized
    ignored: Vec<PathBuf>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self {
            config,
            ignored: Vec::new(),
        })
    }

    /// Keep a file, such as the active config file, out of folder walks
    pub fn ignoring<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.ignored.push(canonical(path.as_ref()));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse an SRT document and synthesize its pages
    pub fn pages_from_srt(&self, document: &str) -> Result<Vec<Page>, CaptionError> {
        let segments = parse_srt(document)?;
        pages::synthesize(&segments, &self.config.captions)
    }

    /// Turn raw engine output into an SRT document and its pages
    ///
    /// The segments pass through the SRT text form so the pages are exactly
    /// what a later reader of the written document would get.
    pub fn captions_from_transcription(&self, output: &serde_json::Value) -> Result<(String, Vec<Page>), CaptionError> {
        let srt = transcription::transcription_to_srt(output)?;
        let pages = self.pages_from_srt(&srt)?;
        Ok((srt, pages))
    }

    /// SRT file → `<stem>.pages.json`
    pub fn process_subtitle_file(&self, input_file: &Path, output_dir: &Path, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let output_file = FileManager::generate_output_path(input_file, output_dir, PAGES_SUFFIX);
        if FileManager::file_exists(&output_file) && !force_overwrite {
            warn!("Output file already exists: {:?}. Use -f to force overwrite.", output_file);
            return Ok(None);
        }

        let content = FileManager::read_to_string(input_file)?;
        let pages = self
            .pages_from_srt(&content)
            .with_context(|| format!("Failed to build pages from {:?}", input_file))?;

        FileManager::write_json(&output_file, &pages)?;
        info!("Wrote {} pages: {:?}", pages.len(), output_file);
        Ok(Some(output_file))
    }

    /// Engine JSON → `<stem>.srt` and `<stem>.pages.json`
    pub fn process_transcription_file(&self, input_file: &Path, output_dir: &Path, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let output = FileManager::read_json(input_file)?;
        self.write_captions(input_file, &output, output_dir, force_overwrite)
    }

    /// Media → engine → `<stem>.srt` and `<stem>.pages.json`
    pub async fn transcribe_media(
        &self,
        engine: &dyn Transcriber,
        input_file: &Path,
        output_dir: &Path,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        engine.ensure_ready().await?;
        info!("Transcribing {:?}", input_file);
        let output = engine.transcribe(input_file).await?;
        self.write_captions(input_file, &output, output_dir, force_overwrite)
    }

    fn write_captions(
        &self,
        input_file: &Path,
        output: &serde_json::Value,
        output_dir: &Path,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        let srt_file = FileManager::generate_output_path(input_file, output_dir, "srt");
        let pages_file = FileManager::generate_output_path(input_file, output_dir, PAGES_SUFFIX);
        if (FileManager::file_exists(&srt_file) || FileManager::file_exists(&pages_file)) && !force_overwrite {
            warn!("Output files already exist for {:?}. Use -f to force overwrite.", input_file);
            return Ok(None);
        }

        let (srt, pages) = self
            .captions_from_transcription(output)
            .with_context(|| format!("Captioning failed for {:?}", input_file))?;

        FileManager::write_to_file(&srt_file, &srt)?;
        FileManager::write_json(&pages_file, &pages)?;
        info!("Wrote {:?} and {} pages to {:?}", srt_file, pages.len(), pages_file);
        Ok(Some(srt_file))
    }

    /// Process one input file according to its type
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<Option<PathBuf>> {
        match FileManager::detect_file_type(&input_file)? {
            FileType::Subtitle => self.process_subtitle_file(&input_file, &output_dir, force_overwrite),
            FileType::Transcription => self.process_transcription_file(&input_file, &output_dir, force_overwrite),
            FileType::Media => {
                let engine = WhisperCppEngine::new(self.config.engine.clone());
                self.transcribe_media(&engine, &input_file, &output_dir, force_overwrite).await
            }
            FileType::Pages => Err(anyhow!("{:?} is already a page sequence", input_file)),
            FileType::Unknown => Err(anyhow!("Unsupported input file: {:?}", input_file)),
        }
    }

    /// SRT and transcription files under a directory that a folder run processes
    ///
    /// Page files and ignored paths are left out.
    pub fn folder_inputs(&self, input_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut inputs = FileManager::find_files(input_dir, "srt")?;
        inputs.extend(
            FileManager::find_files(input_dir, "json")?
                .into_iter()
                .filter(|p| !p.to_string_lossy().ends_with(PAGES_SUFFIX)),
        );
        inputs.retain(|p| !self.ignored.contains(&canonical(p)));
        Ok(inputs)
    }

    /// Build pages for every SRT and transcription file under a directory
    ///
    /// Failures are logged per file and do not stop the walk.
    pub async fn run_folder(&self, input_dir: PathBuf, force_overwrite: bool) -> Result<usize> {
        info!("Processing caption files under {:?}", input_dir);

        let inputs = self.folder_inputs(&input_dir)?;

        let mut processed_count = 0;
        for input in inputs {
            let output_dir = input.parent().unwrap_or(Path::new(".")).to_path_buf();
            match self.run(input.clone(), output_dir, force_overwrite).await {
                Ok(Some(_)) => processed_count += 1,
                Ok(None) => debug!("Skipped {:?}", input),
                Err(e) => error!("Error processing {:?}: {:#}", input, e),
            }
        }

        info!("Finished processing {} files", processed_count);
        Ok(processed_count)
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Load a page sequence, checking each page and that pages are sorted and non-overlapping
pub fn load_pages<P: AsRef<Path>>(path: P) -> Result<Vec<Page>> {
    let path = path.as_ref();
    let content = FileManager::read_to_string(path)?;
    let pages: Vec<Page> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse page file: {:?}", path))?;

    for (i, page) in pages.iter().enumerate() {
        page.check_consistent()
            .map_err(|reason| anyhow!("Page {} is invalid in {:?}: {}", i + 1, path, reason))?;
    }
    for (i, pair) in pages.windows(2).enumerate() {
        if pair[0].end_ms() > pair[1].start_ms {
            return Err(anyhow!("Pages {} and {} overlap in {:?}", i + 1, i + 2, path));
        }
    }
    Ok(pages)
}

/// Human-readable view of what is shown at `time_ms`
pub fn describe_frame(pages: &[Page], time_ms: u64) -> String {
    let Some(frame) = active::resolve(pages, time_ms) else {
        return format!("{}: no active page", timestamp::encode(time_ms));
    };

    let mut out = format!(
        "{}: page {} of {}\n",
        timestamp::encode(time_ms),
        frame.page_index + 1,
        pages.len()
    );
    for line in frame.lines().iter() {
        let rendered: Vec<String> = line
            .iter()
            .map(|token| format!("{} ({:.0}%)", token.text, active::token_progress(token, time_ms) * 100.0))
            .collect();
        let _ = writeln!(out, "  {}", rendered.join("  "));
    }
    out
}

/// Read an SRT file and synthesize its pages with the given options
pub fn pages_from_srt_file<P: AsRef<Path>>(path: P, options: &pages::PageOptions) -> Result<Vec<Page>> {
    let segments = subtitle_processor::read_srt_file(path)?;
    Ok(pages::synthesize(&segments, options)?)
}
