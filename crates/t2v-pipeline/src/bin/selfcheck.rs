use std::path::Path;

use t2v_pipeline::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = PipelineConfig::from_env();

    println!(
        "t2v-selfcheck: starting with videos_dir={}",
        config.videos_dir.display()
    );
    ensure_videos_dir(&config.videos_dir).await?;
    ensure_tools()?;
    ensure_env_present(&["GEMINI_API_KEY"])?;

    println!("t2v-selfcheck: ok");
    Ok(())
}

async fn ensure_videos_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

fn ensure_tools() -> anyhow::Result<()> {
    let ffmpeg = t2v_media::check_ffmpeg()?;
    let ffprobe = t2v_media::check_ffprobe()?;
    println!(
        "t2v-selfcheck: ffmpeg={} ffprobe={}",
        ffmpeg.display(),
        ffprobe.display()
    );
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).map(|v| v.trim().is_empty()).unwrap_or(true) {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
