use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = comps_poller::Args::parse();

	comps_poller::run(args).await
}
