use std::path::PathBuf;

use clap::Parser;
use feed_client::FeedClientHttp;

#[derive(Parser, Debug)]
struct Cli {
    #[clap(short, long)]
    server: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    Submit {
        file: PathBuf,
        #[clap(long)]
        username: Option<String>,
        #[clap(long)]
        caption: Option<String>,
    },
    Feed,
    Fetch {
        storage_key: String,
        #[clap(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let endpoint = args.server.as_deref().unwrap_or("http://127.0.0.1:8080");
    let client = FeedClientHttp::connect(endpoint)?;

    match args.command {
        Command::Submit {
            file,
            username,
            caption,
        } => {
            let image = std::fs::read(&file)?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or("file has no printable name")?
                .to_string();
            let post = client.submit_post(image, &filename, username, caption).await?;
            match post.confidence {
                Some(confidence) => {
                    println!(
                        "The image is classified as {} ({:.1}%).",
                        post.label, confidence
                    )
                }
                None => println!("The image is classified as {}.", post.label),
            }
            println!("Stored as {}", post.storage_key);
        }
        Command::Feed => {
            let posts = client.list_posts().await?;
            println!("Posts ({})", posts.len());
            for post in posts {
                let caption = if post.caption.is_empty() {
                    String::new()
                } else {
                    format!(": {}", post.caption)
                };
                println!(
                    "- [{}] {} by {}{}",
                    post.timestamp, post.label, post.username, caption
                );
            }
        }
        Command::Fetch {
            storage_key,
            output,
        } => {
            let bytes = client.fetch_image(&storage_key).await?;
            let output = output.unwrap_or_else(|| PathBuf::from(&storage_key));
            std::fs::write(&output, bytes)?;
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}
