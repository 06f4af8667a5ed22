use era5dl_lib::cli::{ResolvedCommand, parse_args, resolve_command, run_download, run_plan};
use era5dl_lib::error::Era5DlError;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Era5DlError> {
    color_eyre::install()?;

    let args = parse_args();
    let command = resolve_command(args.command)?;

    match command {
        ResolvedCommand::Download(params) => {
            run_download(params).await?;
        }
        ResolvedCommand::Plan(params) => {
            run_plan(params).await?;
        }
    }

    Ok(())
}
