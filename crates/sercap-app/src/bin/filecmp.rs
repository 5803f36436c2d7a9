use anyhow::Result;
use sercap_compare::run_session;
use std::io;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("************************");
    println!("* Welcome to filecmp   *");
    println!("************************");
    println!("*  pls type e to exit  *");
    println!("************************");

    let stdin = io::stdin();
    let stdout = io::stdout();
    run_session(&mut stdin.lock(), &mut stdout.lock())?;

    Ok(())
}
