use anyhow::Context;
use rusoto_core::HttpClient;
use rusoto_credential::ProfileProvider;
use rusoto_ec2::Ec2Client;
use std::process::ExitCode;

mod cli;
mod cloud_provider;
mod config;

use cloud_provider::{provision, CloudInstance, LaunchCloudInstance};
use config::Config;

fn build_client(config: &Config) -> anyhow::Result<Ec2Client> {
    let credentials = ProfileProvider::new().context("Failed to load AWS credentials profile")?;
    let http_client = HttpClient::new().context("Failed to create HTTP client")?;

    Ok(Ec2Client::new_with(
        http_client,
        credentials,
        config.region.clone(),
    ))
}

fn success_report(instance: &CloudInstance) -> String {
    format!(
        "Successfully started EC2 Instance {} based on AMI {}\n\n\
         The Amazon EC2 Instance ID is {}\n\n",
        instance.id, instance.image_id, instance.id
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = match cli::parse_args(&args) {
        Ok(args) => args,
        Err(err) => {
            log::debug!("{}", err);
            println!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    let ec2_client = match Config::from_env()
        .map_err(anyhow::Error::from)
        .and_then(|config| build_client(&config))
    {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{:#}", err);
            return ExitCode::FAILURE;
        }
    };

    let launch = LaunchCloudInstance::new(&args.name, &args.image_id);
    match provision(&ec2_client, launch).await {
        Ok(instance) => {
            print!("{}", success_report(&instance));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_report_confirms_before_id() {
        let instance = CloudInstance {
            id: "i-0123456789abcdef0".to_string(),
            image_id: "ami-06018068a18569ff2".to_string(),
        };

        assert_eq!(
            success_report(&instance),
            "Successfully started EC2 Instance i-0123456789abcdef0 based on AMI ami-06018068a18569ff2\n\n\
             The Amazon EC2 Instance ID is i-0123456789abcdef0\n\n"
        );
    }
}
