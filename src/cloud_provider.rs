use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use log::{info, warn};
use rusoto_core::RusotoError;
use rusoto_ec2::{
    BlockDeviceMapping, CreateTagsRequest, EbsBlockDevice, Ec2, Ec2Client, Reservation,
    RunInstancesRequest, Tag,
};
use std::error::Error;
use std::fmt;
use xml::reader::{EventReader, XmlEvent};

// -----------------------------------------------------------------------------
// Models
// -----------------------------------------------------------------------------

/// Primary boot device of the Amazon Linux AMIs.
pub const ROOT_DEVICE_NAME: &str = "/dev/xvda";
pub const ROOT_VOLUME_TYPE: VolumeType = VolumeType::Gp3;
pub const ROOT_VOLUME_SIZE_GB: i64 = 20;
pub const DEFAULT_INSTANCE_TYPE: InstanceType = InstanceType::T3Small;

pub const NAME_TAG: &str = "Name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudInstance {
    pub id: String,
    pub image_id: String,
}

pub struct LaunchCloudInstance {
    pub name: String,
    pub image_id: String,
    pub instance_type: InstanceType,
}

impl LaunchCloudInstance {
    pub fn new(name: &str, image_id: &str) -> Self {
        LaunchCloudInstance {
            name: name.to_string(),
            image_id: image_id.to_string(),
            instance_type: DEFAULT_INSTANCE_TYPE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceType {
    T3Small,
}

impl InstanceType {
    pub fn provider_key(&self) -> &'static str {
        match self {
            InstanceType::T3Small => "t3.small",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeType {
    Gp3,
}

impl VolumeType {
    pub fn provider_key(&self) -> &'static str {
        match self {
            VolumeType::Gp3 => "gp3",
        }
    }
}

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
pub enum ProvisionError {
    Launch(String),
    EmptyResponse,
    MissingInstanceId,
    /// The instance was launched but could not be tagged. It is left running.
    Tag {
        instance_id: String,
        message: String,
    },
}

impl Error for ProvisionError {}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProvisionError::Launch(message) => write!(f, "{}", message),
            ProvisionError::EmptyResponse => {
                write!(f, "Launch response did not contain any instance")
            }
            ProvisionError::MissingInstanceId => write!(f, "Instance ID not found"),
            ProvisionError::Tag { message, .. } => write!(f, "{}", message),
        }
    }
}

/// Human readable message of a failed EC2 call.
///
/// EC2 speaks the query protocol and rusoto surfaces most service errors as
/// `Unknown` with the raw XML body, so the `<Message>` element is pulled out
/// of it when present.
pub fn provider_message<E: Error + 'static>(err: &RusotoError<E>) -> String {
    match err {
        RusotoError::Service(err) => err.to_string(),
        RusotoError::Validation(message) => message.clone(),
        RusotoError::Unknown(response) => {
            let body = String::from_utf8_lossy(&response.body);
            match extract_xml_message(&body) {
                Some(message) => message,
                None => format!("Request failed with status {}", response.status),
            }
        }
        err => err.to_string(),
    }
}

fn extract_xml_message(body: &str) -> Option<String> {
    let mut message: Option<String> = None;
    for event in EventReader::from_str(body) {
        match event.ok()? {
            XmlEvent::StartElement { name, .. } if name.local_name == "Message" => {
                message = Some(String::new());
            }
            XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                if let Some(message) = message.as_mut() {
                    message.push_str(&text);
                }
            }
            XmlEvent::EndElement { name } if name.local_name == "Message" => {
                return message.map(|message| message.trim().to_string());
            }
            _ => {}
        }
    }
    None
}

// -----------------------------------------------------------------------------
// Compute service
// -----------------------------------------------------------------------------

/// The two EC2 calls provisioning needs. Errors are the provider's message.
#[async_trait]
pub trait ComputeService {
    async fn run_instances(&self, input: RunInstancesRequest) -> Result<Reservation, String>;
    async fn create_tags(&self, input: CreateTagsRequest) -> Result<(), String>;
}

#[async_trait]
impl ComputeService for Ec2Client {
    async fn run_instances(&self, input: RunInstancesRequest) -> Result<Reservation, String> {
        Ec2::run_instances(self, input)
            .await
            .map_err(|err| provider_message(&err))
    }

    async fn create_tags(&self, input: CreateTagsRequest) -> Result<(), String> {
        Ec2::create_tags(self, input)
            .await
            .map_err(|err| provider_message(&err))
    }
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

pub fn startup_script(name: &str) -> String {
    format!("#!/bin/bash \nhostnamectl set-hostname {}", name)
}

pub fn encode_user_data(script: &str) -> String {
    general_purpose::STANDARD.encode(script.as_bytes())
}

pub fn create_instance_request(launch: &LaunchCloudInstance) -> RunInstancesRequest {
    let root_volume = BlockDeviceMapping {
        device_name: Some(ROOT_DEVICE_NAME.to_string()),
        ebs: Some(EbsBlockDevice {
            volume_type: Some(ROOT_VOLUME_TYPE.provider_key().to_string()),
            volume_size: Some(ROOT_VOLUME_SIZE_GB),
            ..Default::default()
        }),
        ..Default::default()
    };

    RunInstancesRequest {
        image_id: Some(launch.image_id.to_string()),
        instance_type: Some(launch.instance_type.provider_key().to_string()),
        min_count: 1,
        max_count: 1,
        block_device_mappings: Some(vec![root_volume]),
        user_data: Some(encode_user_data(&startup_script(&launch.name))),
        ..Default::default()
    }
}

pub fn create_tag_request(instance_id: &str, name: &str) -> CreateTagsRequest {
    CreateTagsRequest {
        resources: vec![instance_id.to_string()],
        tags: vec![Tag {
            key: Some(NAME_TAG.to_string()),
            value: Some(name.to_string()),
        }],
        ..Default::default()
    }
}

fn first_instance_id(reservation: Reservation) -> Result<String, ProvisionError> {
    let instance = reservation
        .instances
        .and_then(|instances| instances.into_iter().next())
        .ok_or(ProvisionError::EmptyResponse)?;

    instance
        .instance_id
        .ok_or(ProvisionError::MissingInstanceId)
}

/// Launches one instance and tags it with its name.
///
/// Nothing is rolled back: when tagging fails the launched instance keeps
/// running untagged and its id is carried in `ProvisionError::Tag`.
pub async fn provision<C>(
    compute: &C,
    launch: LaunchCloudInstance,
) -> Result<CloudInstance, ProvisionError>
where
    C: ComputeService + Sync + ?Sized,
{
    let run_instance_req = create_instance_request(&launch);
    info!(
        "Launching {} instance from {}",
        launch.instance_type.provider_key(),
        launch.image_id
    );

    let reservation = compute
        .run_instances(run_instance_req)
        .await
        .map_err(ProvisionError::Launch)?;
    let instance_id = first_instance_id(reservation)?;
    info!("Launched instance {}", instance_id);

    let tag_req = create_tag_request(&instance_id, &launch.name);
    if let Err(message) = compute.create_tags(tag_req).await {
        warn!(
            "Instance {} is running but could not be tagged: {}",
            instance_id, message
        );
        return Err(ProvisionError::Tag {
            instance_id,
            message,
        });
    }
    info!("Tagged instance {} with {}={}", instance_id, NAME_TAG, launch.name);

    Ok(CloudInstance {
        id: instance_id,
        image_id: launch.image_id,
    })
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
