//! nusb-backed [`Transport`] for a claimed meter HID interface.

use crate::config::SessionConfig;
use crate::constants::{FRAME_LEN, HID_INTERFACE_CLASS, RESET_SETTLE_DELAY};
use crate::device::{self, DeviceIdentity, SUPPORTED_DEVICES, SupportedDevice};
use crate::error::{DiscoveryError, FnirsiError, TransportError};
use crate::frame::RawFrame;
use crate::transport::Transport;
use nusb::transfer::{Direction, EndpointType, Queue, RequestBuffer};
use nusb::{Device, DeviceInfo, Interface};
use std::io;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Find the attached meter that comes first in `candidates`.
pub fn discover(candidates: &[SupportedDevice]) -> Result<(DeviceInfo, SupportedDevice), DiscoveryError> {
    let devices = nusb::list_devices().map_err(DiscoveryError::Enumeration)?;
    let found = devices.map(|info| {
        let identity = DeviceIdentity::new(info.vendor_id(), info.product_id());
        (info, identity)
    });
    device::select(found, candidates).ok_or(DiscoveryError::DeviceNotFound)
}

/// HID interface number and its interrupt endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidEndpoints {
    pub interface: u8,
    pub endpoint_in: u8,
    pub endpoint_out: u8,
}

/// Locate the HID interface in the active configuration, selecting the first
/// configuration if the device is unconfigured.
pub fn find_hid_interface(device: &Device) -> Result<HidEndpoints, FnirsiError> {
    let config = match device.active_configuration() {
        Ok(config) => config,
        Err(e) => {
            warn!("{e}; selecting the first configuration");
            let value = device
                .configurations()
                .next()
                .map(|c| c.configuration_value())
                .ok_or(FnirsiError::NoHidInterface)?;
            device.set_configuration(value).map_err(|source| FnirsiError::Interface {
                context: "set USB configuration",
                source,
            })?;
            device.active_configuration().map_err(|e| FnirsiError::Interface {
                context: "read active USB configuration",
                source: io::Error::other(e),
            })?
        }
    };

    let alt = config
        .interface_alt_settings()
        .find(|alt| alt.class() == HID_INTERFACE_CLASS)
        .ok_or(FnirsiError::NoHidInterface)?;
    let interface = alt.interface_number();

    let endpoint = |wanted: Direction| {
        alt.endpoints()
            .find(|ep| ep.transfer_type() == EndpointType::Interrupt && ep.direction() == wanted)
            .map(|ep| ep.address())
    };

    Ok(HidEndpoints {
        interface,
        endpoint_in: endpoint(Direction::In).ok_or(FnirsiError::MissingEndpoint { interface, direction: "IN" })?,
        endpoint_out: endpoint(Direction::Out).ok_or(FnirsiError::MissingEndpoint { interface, direction: "OUT" })?,
    })
}

/// Log every configuration, interface and endpoint the device exposes.
pub fn log_configurations(device: &Device) {
    for config in device.configurations() {
        info!(value = config.configuration_value(), "Configuration");
        for alt in config.interface_alt_settings() {
            info!(
                interface = alt.interface_number(),
                alt_setting = alt.alternate_setting(),
                class = format!("{:#04x}", alt.class()),
                "  Interface"
            );
            for ep in alt.endpoints() {
                info!(
                    address = format!("{:#04x}", ep.address()),
                    direction = ?ep.direction(),
                    transfer = ?ep.transfer_type(),
                    max_packet_size = ep.max_packet_size(),
                    "    Endpoint"
                );
            }
        }
    }
}

/// A claimed meter HID interface.
pub struct UsbTransport {
    interface: Interface,
    in_queue: Queue<RequestBuffer>,
    endpoints: HidEndpoints,
    write_timeout: Duration,
}

impl UsbTransport {
    /// Discover the first supported meter, reset it if configured, and claim its HID interface.
    pub async fn open(config: &SessionConfig) -> Result<(Self, SupportedDevice), FnirsiError> {
        info!("Searching for FNIRSI power meter...");
        let (device_info, supported) = discover(&SUPPORTED_DEVICES)?;
        info!(
            model = %supported.model,
            variant = %supported.variant,
            id = %supported.identity,
            bus = device_info.bus_number(),
            addr = device_info.device_address(),
            "Found device"
        );

        let device = device_info.open().map_err(|source| FnirsiError::Interface {
            context: "open USB device",
            source,
        })?;

        if config.reset_device {
            info!("Performing USB device reset...");
            device.reset().map_err(|source| FnirsiError::Interface {
                context: "reset USB device",
                source,
            })?;
            tokio::time::sleep(RESET_SETTLE_DELAY).await;
        }

        if config.describe_device {
            log_configurations(&device);
        }

        let endpoints = find_hid_interface(&device)?;
        debug!(?endpoints, "Using HID interface");

        let interface = device
            .detach_and_claim_interface(endpoints.interface)
            .map_err(|source| FnirsiError::Interface {
                context: "claim HID interface",
                source,
            })?;
        info!(interface = endpoints.interface, "Interface claimed successfully.");

        Ok((Self::new(interface, endpoints, config.write_timeout), supported))
    }

    pub fn new(interface: Interface, endpoints: HidEndpoints, write_timeout: Duration) -> Self {
        let in_queue = interface.interrupt_in_queue(endpoints.endpoint_in);
        Self {
            interface,
            in_queue,
            endpoints,
            write_timeout,
        }
    }
}

impl Transport for UsbTransport {
    async fn write(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), TransportError> {
        debug!(bytes = hex::encode(frame), "USB Write");
        let transfer = self.interface.interrupt_out(self.endpoints.endpoint_out, frame.to_vec());
        let completion = tokio::time::timeout(self.write_timeout, transfer).await?;
        completion.into_result()?;
        Ok(())
    }

    async fn read(&mut self, timeout: Duration) -> Result<RawFrame, TransportError> {
        // A transfer left pending by a timed-out read is still valid; only submit when idle.
        if self.in_queue.pending() == 0 {
            self.in_queue.submit(RequestBuffer::new(FRAME_LEN));
        }
        let completion = tokio::time::timeout(timeout, self.in_queue.next_complete()).await?;
        let data = completion.into_result()?;
        self.in_queue.submit(RequestBuffer::new(FRAME_LEN));

        trace!(bytes = hex::encode(&data), "USB Read");
        RawFrame::try_from(data.as_slice()).map_err(|_| TransportError::ShortFrame { len: data.len() })
    }
}
