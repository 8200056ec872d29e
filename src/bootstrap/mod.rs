// Copyright (c) 2025 - Cowboy AI, Inc.
//! Instance Bootstrap Scripts
//!
//! Builds the startup script each instance runs once at first boot. Optional
//! steps are decided at generation time, so a script only contains the
//! configuration its deployment actually uses.
//!
//! A sensor script traps its own exit: if any step fails it stops the web
//! service the health check probes. The instance then reports unhealthy and
//! the instance group replaces it, which is the only self-healing signal a
//! sensor has.

use serde_json::{json, Value};
use std::fmt::Display;
use std::net::Ipv4Addr;

use crate::domain::Ref;

/// Log and metric pipeline of the telemetry agent, shipped verbatim
pub const OPS_AGENT_CONFIG: &str = include_str!("ops_agent.yaml");

/// Metadata key of the startup script
pub const STARTUP_SCRIPT_KEY: &str = "startup-script";

/// Metadata key of administrator SSH keys
pub const SSH_KEYS_KEY: &str = "ssh-keys";

const OPS_AGENT_REPO_SCRIPT: &str =
    "https://dl.google.com/cloudagents/add-google-cloud-ops-agent-repo.sh";
const SENSOR_INSTALLER: &str = "https://packages.darktrace.com/install";
const USER_DATA_LOG: &str = "/var/log/user-data.log";

/// Direct osSensor ingestion settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsSensorIngest {
    /// Shared HMAC secret
    pub hmac: String,
    /// Load balancer frontend address registered with the sensor
    pub frontend_ip: Ipv4Addr,
}

/// Capture upload settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcapUpload {
    /// Bucket name output of the storage template
    pub bucket_name: Ref,
    /// Email of the fleet service account
    pub service_account_email: Ref,
}

/// Inputs of a fleet member's startup script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorBootstrap {
    pub update_key: String,
    pub push_token: String,
    pub appliance_hostname: String,
    pub appliance_port: u16,
    pub ossensor: Option<OsSensorIngest>,
    pub pcap_upload: Option<PcapUpload>,
}

impl SensorBootstrap {
    /// Render the startup script
    pub fn render(&self) -> String {
        let mut script = ScriptBuilder::new();
        script.exit_trap();
        script.redirect_output();
        script.line("trap exittrap EXIT");
        script.blank();
        script.echo("Starting userdata, installing Cloud OPS agent for logging");
        script.install_ops_agent(true);

        script.echo("Starting vSensor installation");
        script.line(format!(
            "bash <(wget -O - {SENSOR_INSTALLER}) --updateKey {}",
            self.update_key
        ));
        script.echo("Setting configuration");
        script.line(format!("set_updatekey.sh {}", self.update_key));
        script.line(format!(
            "set_pushtoken.sh {} {}:{}",
            self.push_token, self.appliance_hostname, self.appliance_port
        ));
        script.line("set_ossensor_loadbalancer_direct.sh 1");
        script.line("set_ephemeral.sh 1");

        if let Some(ossensor) = &self.ossensor {
            script.line(format!("set_ossensor_hmac.sh {}", ossensor.hmac));
            script.line(format!("set_gcp_lb_ip.sh \"{}\"", ossensor.frontend_ip));
        }

        match &self.pcap_upload {
            Some(upload) => script.line(format!(
                "set_pcap_gcp_bucket.sh \"{}\" \"{}\"",
                upload.bucket_name, upload.service_account_email
            )),
            None => script.line("set_pcap_size.sh 0"),
        }

        script.echo("Completed vSensor configuration");
        script.finish()
    }
}

/// Render the bastion startup script: telemetry agent only
pub fn bastion_startup_script() -> String {
    let mut script = ScriptBuilder::new();
    script.redirect_output();
    script.echo("Installing Monitoring Agent");
    script.install_ops_agent(false);
    script.finish()
}

/// Instance metadata items: the startup script and an optional SSH key entry
pub fn instance_metadata(startup_script: String, ssh_user_key: Option<&str>) -> Value {
    let mut items = vec![json!({"key": STARTUP_SCRIPT_KEY, "value": startup_script})];
    if let Some(key) = ssh_user_key {
        items.push(json!({"key": SSH_KEYS_KEY, "value": key}));
    }
    json!({ "items": items })
}

struct ScriptBuilder {
    lines: Vec<String>,
}

impl ScriptBuilder {
    fn new() -> Self {
        Self {
            lines: vec!["#! /bin/bash -xe".to_string()],
        }
    }

    fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn echo(&mut self, message: impl Display) {
        self.lines.push(format!("echo \"{message}\""));
    }

    fn exit_trap(&mut self) {
        self.lines.extend(
            [
                "function exittrap() {",
                "  exitcode=\"$?\"",
                "  set +e",
                "  if [ \"$exitcode\" -gt 0 ]; then",
                "    echo \"Failed to successfully configure vSensor, more details in /var/log/user-data.log\"",
                "    all-services.sh -f nginx stop",
                "    echo \"Instance marked as unhealthy.\"",
                "  fi",
                "  exit \"$exitcode\"",
                "}",
                "",
            ]
            .map(String::from),
        );
    }

    fn redirect_output(&mut self) {
        self.line(format!(
            "exec > >(tee -a {USER_DATA_LOG}|logger -t user-data -s 2>/dev/console) 2>&1"
        ));
        self.blank();
    }

    fn install_ops_agent(&mut self, announce: bool) {
        self.line(format!("curl -sSO {OPS_AGENT_REPO_SCRIPT}"));
        self.line("bash add-google-cloud-ops-agent-repo.sh --also-install");
        self.line("cat >/etc/google-cloud-ops-agent/config.yaml <<EOF");
        self.lines.extend(OPS_AGENT_CONFIG.lines().map(str::to_string));
        self.line("EOF");
        self.line("service google-cloud-ops-agent restart");
        if announce {
            self.echo("Completed Google Cloud Ops Configuration");
        }
    }

    fn finish(self) -> String {
        let mut script = self.lines.join("\n");
        script.push('\n');
        script
    }
}
