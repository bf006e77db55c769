use ftp_lite::client::{FtpClient, FtpConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Public test server, read-only account
    let mut client = FtpClient::new(FtpConfig::new("test.rebex.net", "demo", "password"));

    client.connect_and_login().await?;
    if let Some(greeting) = client.greeting() {
        println!("server says: {}", greeting.message);
    }

    for entry in client.list("/").await? {
        println!("{} {:>10} {}", entry.modified, entry.size, entry.name);
    }

    client.download("/readme.txt", "readme.txt").await?;
    println!("saved readme.txt");

    client.disconnect().await?;
    Ok(())
}
