use anyhow::Result;
use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};
use symphonia::core::{
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

/// Reads the length of an audio file from its container headers.
pub async fn duration_of(path: &Path) -> Result<Duration> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_duration(&path)).await?
}

fn read_duration(path: &Path) -> Result<Duration> {
    let file = File::open(path)?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let opened = symphonia::default::get_probe().format(
        &hint,
        stream,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let track = opened
        .format
        .default_track()
        .ok_or_else(|| anyhow::anyhow!("Sin pista de audio en {}", path.display()))?;
    let params = &track.codec_params;

    let frames = params
        .n_frames
        .ok_or_else(|| anyhow::anyhow!("Duración desconocida para {}", path.display()))?;
    let rate = params
        .sample_rate
        .filter(|r| *r > 0)
        .ok_or_else(|| anyhow::anyhow!("Frecuencia de muestreo desconocida para {}", path.display()))?;

    Ok(Duration::from_secs_f64(frames as f64 / rate as f64))
}
