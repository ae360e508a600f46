use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "docrecon",
    about = "Extract document entities two ways and reconcile them",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve a Pub/Sub push endpoint for upload notifications
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Process one base64-encoded trigger payload
    Event {
        /// Base64 JSON of {bucket, name, contentType}
        data: String,
    },
    /// Process one object directly
    Process {
        /// Source bucket
        #[arg(long)]
        bucket: String,
        /// Object path within the bucket
        #[arg(long)]
        name: String,
        /// Declared MIME type of the object
        #[arg(long = "content-type", default_value = "application/pdf")]
        content_type: String,
    },
    /// Ask the model whether two names refer to the same party
    MatchNames {
        /// Name to validate
        candidate: String,
        /// Name extracted from the document
        extracted: String,
    },
}
