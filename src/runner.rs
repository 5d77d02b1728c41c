use atat::AtatCmd;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use embedded_io_async::Write;
use heapless::Vec;

use crate::command::control::{SetDataRate, SetEchoOff};
use crate::command::gnss::responses::gnss_power;
use crate::command::gnss::types::GnssPower;
use crate::command::gnss::{GetGnssInfo, GetGnssPower, SetGnssPower};
use crate::command::mobile_control::types::{Functionality, ResetMode as FunResetMode};
use crate::command::mobile_control::SetModuleFunctionality;
use crate::command::mqtt::{SetMqttNumParam, SetMqttParam, SetMqttServer};
use crate::command::network_service::responses::{
    band_technology, gprs_registration, has_service, system_mode,
};
use crate::command::network_service::{
    GetBandConfig, GetGPRSNetworkRegistrationStatus, GetSystemInfo,
};
use crate::command::psn::types::{
    AppNetworkAction, AuthenticationType, PDPContextStatus, PdpIpType,
};
use crate::command::psn::{
    GetAppNetworkActive, GetPDPAddress, GetPDPContextDefinition, GetPDPContextState, Ping,
    SetAppNetworkActive, SetPDPContextDefinition, SetPDPContextState, SetPdpConfig,
    SetPdpConfigAuth, SetPingPdp,
};
use crate::{
    client::CompareMode,
    config::{Apn, ModemConfig},
    error::Error,
    frame::{utf8_prefix, Frame, FRAME_CAPACITY},
    gnss::{parse_fix, Fix, FixOutcome},
    pwr::{PwrCtrl, ResetMode},
    state::{BatchReport, BearerStep, Context, ProvisioningState, Status, StepReport},
    AtHandle,
};

/// Marks the end of a multi-frame reply
const REPLY_END: &[u8] = b"\nOK";

const BAND_REPLY_CAPACITY: usize = 2 * FRAME_CAPACITY;

const PING_PACKETS: u16 = 5;
const PING_SIZE: u16 = 1;
const PING_TIMEOUT_MS: u32 = 20000;

/// Background runner bringing the module up and keeping it polled.
///
/// You must call `.run()` in a background task for the module to be
/// provisioned.
pub struct Runner<'d, M: RawMutex, W, C> {
    at: AtHandle<'d, M, W>,
    status: &'d Status<M>,
    config: C,
    ctx: Context,
}

impl<'d, M, W, C> Runner<'d, M, W, C>
where
    M: RawMutex,
    W: Write,
    C: ModemConfig<'d>,
{
    pub(crate) fn new(at: AtHandle<'d, M, W>, status: &'d Status<M>, config: C) -> Self {
        Self {
            at,
            status,
            config,
            ctx: Context::new(),
        }
    }

    pub fn state(&self) -> ProvisioningState {
        self.ctx.state
    }

    pub fn last_fix(&self) -> Option<&Fix> {
        self.ctx.fix.as_ref()
    }

    /// Outcome of every command of the most recent bearer setup.
    pub fn bearer_report(&self) -> &BatchReport {
        &self.ctx.bearer
    }

    pub async fn run(&mut self) -> ! {
        if let Err(e) = self.power_cycle(ResetMode::Full).await {
            error!("Failed to power cycle the modem: {:?}", e);
        }
        Timer::after(C::TIMING.boot_wait).await;

        loop {
            Timer::after(self.tick_delay()).await;
            self.step().await;
        }
    }

    fn tick_delay(&self) -> Duration {
        match self.ctx.state {
            ProvisioningState::BaudSync => C::TIMING.baud_retry_delay,
            ProvisioningState::EchoOff => C::TIMING.echo_retry_delay,
            _ => C::TIMING.state_delay,
        }
    }

    /// Run the current state once and move on to whichever state it picks.
    pub async fn step(&mut self) {
        let next = match self.ctx.state {
            ProvisioningState::BaudSync => self.baud_sync().await,
            ProvisioningState::EchoOff => self.echo_off().await,
            ProvisioningState::GnssEnable => self.gnss_enable().await,
            ProvisioningState::GnssPoll => self.gnss_poll().await,
            ProvisioningState::GnssDisable => self.gnss_disable().await,
            ProvisioningState::NetworkStatusCheck => self.network_status_check().await,
            ProvisioningState::BandCheck => self.band_check().await,
            ProvisioningState::BearerSetup => self.bearer_setup().await,
            ProvisioningState::RegistrationCheck => self.registration_check().await,
            ProvisioningState::MqttConfigure => self.mqtt_configure().await,
            ProvisioningState::SteadyPoll => self.steady_poll().await,
        };

        if next != self.ctx.state {
            self.status.set_state(next);
        }
        self.ctx.transition(next);
    }

    async fn power_cycle(&mut self, mode: ResetMode) -> Result<(), Error> {
        PwrCtrl::new(&mut self.config).power_cycle(mode).await
    }

    async fn query<Cmd: AtatCmd>(&self, cmd: &Cmd) -> Result<Frame, Error> {
        self.at
            .send(cmd, "", CompareMode::Return, C::COMMAND_RETRIES)
            .await
    }

    /// Count an unanswered probe, power cycling the module every `limit`
    /// attempts.
    async fn unanswered(&mut self, limit: u16) {
        self.ctx.attempt += 1;
        if self.ctx.attempt < limit {
            return;
        }

        warn!("No answer after {} attempts", self.ctx.attempt);
        self.ctx.attempt = 0;
        if let Err(e) = self.power_cycle(ResetMode::Toggle).await {
            error!("Failed to power cycle the modem: {:?}", e);
        }
    }

    async fn baud_sync(&mut self) -> ProvisioningState {
        let cmd = SetDataRate { rate: C::BAUD_RATE };
        match self.at.send(&cmd, "", CompareMode::Return, 1).await {
            Ok(frame) if !frame.is_empty() => {
                info!("Modem answering at {} baud", C::BAUD_RATE);
                ProvisioningState::EchoOff
            }
            _ => {
                self.unanswered(C::BAUD_SYNC_ATTEMPTS).await;
                ProvisioningState::BaudSync
            }
        }
    }

    async fn echo_off(&mut self) -> ProvisioningState {
        match self.at.send(&SetEchoOff, "", CompareMode::Return, 1).await {
            Ok(_) => ProvisioningState::GnssEnable,
            Err(_) => {
                self.unanswered(C::ECHO_OFF_ATTEMPTS).await;
                ProvisioningState::EchoOff
            }
        }
    }

    async fn query_gnss_power(&self) -> Option<GnssPower> {
        match self.query(&GetGnssPower).await {
            Ok(frame) => {
                let power = gnss_power(frame.text());
                if power.is_none() {
                    warn!("No GNSS power state in {:?}", frame.text());
                }
                power
            }
            Err(e) => {
                warn!("GNSS power query failed: {:?}", e);
                None
            }
        }
    }

    async fn set_gnss_power(&self, mode: GnssPower) {
        let cmd = SetGnssPower { mode };
        if let Err(e) = self
            .at
            .send(&cmd, "", CompareMode::None, C::COMMAND_RETRIES)
            .await
        {
            warn!("Switching GNSS {:?} failed: {:?}", mode, e);
        }
    }

    async fn gnss_enable(&mut self) -> ProvisioningState {
        match self.query_gnss_power().await {
            Some(GnssPower::On) => ProvisioningState::GnssPoll,
            Some(GnssPower::Off) => {
                self.set_gnss_power(GnssPower::On).await;
                ProvisioningState::GnssEnable
            }
            None => ProvisioningState::GnssEnable,
        }
    }

    async fn gnss_poll(&mut self) -> ProvisioningState {
        self.ctx.attempt += 1;

        let outcome = match self.query(&GetGnssInfo).await {
            Ok(frame) => parse_fix(frame.text()),
            Err(e) => {
                warn!("GNSS info query failed: {:?}", e);
                FixOutcome::NotApplicable
            }
        };

        match outcome {
            FixOutcome::Valid(fix) => {
                info!(
                    "Fix {}/{}/{} {}: {}, {}",
                    fix.year.as_str(),
                    fix.month.as_str(),
                    fix.day.as_str(),
                    fix.time.as_str(),
                    fix.latitude.as_str(),
                    fix.longitude.as_str()
                );
                self.ctx.fixes += 1;
                self.status.set_fix(fix.clone());
                self.ctx.fix = Some(fix);
            }
            FixOutcome::Acquiring => {
                info!("Synchronizing GNSS");
                self.ctx.fixes = 0;
            }
            FixOutcome::NotApplicable => {
                warn!("No GNSS fix");
                self.ctx.fixes = 0;
            }
        }

        if self.ctx.fixes >= C::REQUIRED_FIXES {
            ProvisioningState::GnssDisable
        } else if self.ctx.attempt >= C::MAX_FIX_POLLS {
            warn!("No stable fix after {} polls", self.ctx.attempt);
            ProvisioningState::GnssDisable
        } else {
            ProvisioningState::GnssPoll
        }
    }

    async fn gnss_disable(&mut self) -> ProvisioningState {
        match self.query_gnss_power().await {
            Some(GnssPower::Off) => ProvisioningState::NetworkStatusCheck,
            Some(GnssPower::On) => {
                self.set_gnss_power(GnssPower::Off).await;
                Timer::after(C::TIMING.command_gap).await;
                ProvisioningState::GnssDisable
            }
            None => ProvisioningState::GnssDisable,
        }
    }

    async fn network_status_check(&mut self) -> ProvisioningState {
        let frame = match self.query(&GetSystemInfo).await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("System info query failed: {:?}", e);
                return ProvisioningState::NetworkStatusCheck;
            }
        };

        if has_service(frame.text()) {
            info!("Network: {:?}", system_mode(frame.text()));
            ProvisioningState::BandCheck
        } else {
            info!("No service");
            ProvisioningState::NetworkStatusCheck
        }
    }

    async fn band_check(&mut self) -> ProvisioningState {
        let mut reply: Vec<u8, BAND_REPLY_CAPACITY> = Vec::new();
        {
            // Hold the client until the last frame is in, nothing else may
            // be sent meanwhile
            let mut at = self.at.lock().await;

            let mut next = at
                .send(&GetBandConfig, "", CompareMode::Return, C::COMMAND_RETRIES)
                .await
                .ok();
            let mut frames = 0;
            loop {
                if let Some(frame) = next.take() {
                    frames += 1;
                    if reply.extend_from_slice(&frame).is_err() {
                        warn!("Band configuration exceeds {} bytes", BAND_REPLY_CAPACITY);
                        break;
                    }
                }
                if reply.windows(REPLY_END.len()).any(|w| w == REPLY_END)
                    || frames >= C::MAX_BAND_FRAMES
                {
                    break;
                }

                Timer::after(C::TIMING.band_frame_gap).await;
                next = at
                    .policy()
                    .mailbox()
                    .consume(C::TIMING.frame_timeout)
                    .await;
                if next.is_none() {
                    warn!("Band configuration incomplete");
                    break;
                }
            }
        }

        let text = utf8_prefix(&reply);
        debug!("Bands: {:?}", text);

        let matched = match band_technology(text) {
            Some(technology) if technology == C::RADIO_TECHNOLOGY => {
                info!("Configured for {}", technology);
                true
            }
            Some(technology) => {
                warn!(
                    "Configured for {}, expected {}",
                    technology,
                    C::RADIO_TECHNOLOGY
                );
                false
            }
            None => {
                warn!("No band configuration in reply");
                false
            }
        };

        if C::BAND_CHECK_ADVANCES && matched {
            ProvisioningState::BearerSetup
        } else {
            ProvisioningState::NetworkStatusCheck
        }
    }

    fn record(&mut self, step: BearerStep, res: Result<Frame, Error>) {
        match &res {
            Ok(frame) => info!("{:?}: {:?}", step, frame.text()),
            Err(e) => warn!("{:?} failed: {:?}", step, e),
        }

        let report = StepReport {
            step,
            result: res.map(|frame| frame.len()),
        };
        if self.ctx.bearer.push(report).is_err() {
            warn!("Bearer report full, {:?} not recorded", step);
        }
    }

    /// Fixed batch bringing up the PDP context and the application network.
    /// Failures are recorded, the batch carries on regardless.
    async fn bearer_setup(&mut self) -> ProvisioningState {
        self.ctx.bearer.clear();
        let timing = C::TIMING;

        let res = self
            .query(&SetModuleFunctionality {
                fun: Functionality::Full,
                rst: Some(FunResetMode::DontReset),
            })
            .await;
        self.record(BearerStep::Functionality, res);
        Timer::after(timing.command_gap).await;

        if let Apn::Given { name, .. } = C::APN {
            let res = self
                .query(&SetPDPContextDefinition {
                    cid: 1,
                    pdp_type: "IP",
                    apn: name,
                    pdp_addr: "0.0.0.0",
                })
                .await;
            self.record(BearerStep::ContextDefinition, res);
        }

        let res = self.query(&GetPDPAddress).await;
        self.record(BearerStep::ContextAddress, res);
        let res = self.query(&GetPDPContextDefinition).await;
        self.record(BearerStep::ContextQuery, res);

        match C::APN {
            Apn::Given {
                name,
                username: Some(username),
                password: Some(password),
            } => {
                let res = self
                    .query(&SetPdpConfigAuth {
                        pdp_idx: 0,
                        ip_type: PdpIpType::IPv4,
                        apn: name,
                        username,
                        password,
                        authentication: AuthenticationType::PapOrChap,
                    })
                    .await;
                self.record(BearerStep::PdpConfig, res);
            }
            Apn::Given { name, .. } => {
                let res = self
                    .query(&SetPdpConfig {
                        pdp_idx: 0,
                        ip_type: PdpIpType::IPv4,
                        apn: name,
                    })
                    .await;
                self.record(BearerStep::PdpConfig, res);
            }
            Apn::None => {}
        }

        let res = self
            .query(&SetPDPContextState {
                status: PDPContextStatus::Activated,
                cid: 1,
            })
            .await;
        self.record(BearerStep::ContextActivation, res);
        let res = self.query(&GetPDPContextState).await;
        self.record(BearerStep::ContextStateQuery, res);
        let res = self.query(&GetSystemInfo).await;
        self.record(BearerStep::SystemInfo, res);
        let res = self.query(&GetPDPAddress).await;
        self.record(BearerStep::AddressQuery, res);
        let res = self
            .query(&SetAppNetworkActive {
                pdp_idx: 0,
                action: AppNetworkAction::Activate,
            })
            .await;
        self.record(BearerStep::AppNetworkActivation, res);

        Timer::after(timing.long_command_gap).await;
        let res = self.query(&SetPingPdp { pdp_idx: 0 }).await;
        self.record(BearerStep::PingPdp, res);

        if let Some(host) = C::PING_HOST {
            for _ in 0..C::PING_COUNT {
                Timer::after(timing.long_command_gap).await;
                let res = self
                    .query(&Ping {
                        host,
                        count: PING_PACKETS,
                        size: PING_SIZE,
                        timeout: PING_TIMEOUT_MS,
                    })
                    .await;
                self.record(BearerStep::Ping, res);
            }
        }

        let failed = self
            .ctx
            .bearer
            .iter()
            .filter(|report| report.result.is_err())
            .count();
        if failed > 0 {
            warn!(
                "Bearer setup: {} of {} commands failed",
                failed,
                self.ctx.bearer.len()
            );
        }

        ProvisioningState::RegistrationCheck
    }

    async fn registration_check(&mut self) -> ProvisioningState {
        match self.query(&GetGPRSNetworkRegistrationStatus).await {
            Ok(frame) => info!("Registration: {:?}", gprs_registration(frame.text())),
            Err(e) => warn!("Registration query failed: {:?}", e),
        }

        if C::MQTT.is_some() {
            ProvisioningState::MqttConfigure
        } else {
            ProvisioningState::SteadyPoll
        }
    }

    /// Push one MQTT client parameter per tick, `attempt` indexing the
    /// parameter.
    async fn mqtt_configure(&mut self) -> ProvisioningState {
        let Some(mqtt) = C::MQTT else {
            return ProvisioningState::SteadyPoll;
        };
        Timer::after(C::TIMING.mqtt_step_gap).await;

        let step = self.ctx.attempt;
        let res = match step {
            0 => {
                self.query(&SetMqttServer {
                    param: "URL",
                    url: mqtt.url,
                    port: mqtt.port,
                })
                .await
            }
            1 => {
                self.query(&SetMqttNumParam {
                    param: "KEEPTIME",
                    value: mqtt.keep_alive,
                })
                .await
            }
            2 => {
                self.query(&SetMqttNumParam {
                    param: "CLEANSS",
                    value: mqtt.clean_session as u16,
                })
                .await
            }
            3 => {
                self.query(&SetMqttParam {
                    param: "CLIENTID",
                    value: mqtt.client_id,
                })
                .await
            }
            4 => {
                self.query(&SetMqttNumParam {
                    param: "QOS",
                    value: mqtt.qos as u16,
                })
                .await
            }
            5 => {
                self.query(&SetMqttParam {
                    param: "TOPIC",
                    value: mqtt.topic,
                })
                .await
            }
            6 => {
                self.query(&SetMqttParam {
                    param: "USERNAME",
                    value: mqtt.username,
                })
                .await
            }
            7 => {
                self.query(&SetMqttParam {
                    param: "PASSWORD",
                    value: mqtt.password,
                })
                .await
            }
            _ => {
                info!("MQTT client configured");
                return ProvisioningState::SteadyPoll;
            }
        };

        if let Err(e) = res {
            warn!("MQTT parameter {} not set: {:?}", step, e);
        }
        self.ctx.attempt += 1;
        ProvisioningState::MqttConfigure
    }

    async fn steady_poll(&mut self) -> ProvisioningState {
        match self.query(&GetAppNetworkActive).await {
            Ok(frame) => info!("App network: {:?}", frame.text()),
            Err(e) => warn!("App network query failed: {:?}", e),
        }
        Timer::after(C::TIMING.long_command_gap).await;
        match self.query(&GetSystemInfo).await {
            Ok(frame) => info!("System: {:?}", frame.text()),
            Err(e) => warn!("System info query failed: {:?}", e),
        }

        ProvisioningState::NetworkStatusCheck
    }
}
