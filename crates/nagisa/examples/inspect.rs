use nagisa::{HttpClient, Parser};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(path), Some(url)) = (args.next(), args.next()) else {
        eprintln!("Usage: inspect <manifest_file> <manifest_url>");
        std::process::exit(1);
    };

    let body = std::fs::read_to_string(path)?;
    let manifest = Parser::new()
        .with_client(HttpClient::default())
        .parse(&body, &url)
        .await?;

    if let Some(duration) = manifest.duration {
        println!("Duration: {duration:.1}s");
    }
    for video in &manifest.tracks.videos {
        println!("{video}");
    }
    for audio in &manifest.tracks.audios {
        println!("{audio}");
    }
    for subtitle in &manifest.tracks.subtitles {
        println!("{subtitle}");
    }

    Ok(())
}
