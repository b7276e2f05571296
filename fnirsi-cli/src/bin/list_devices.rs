use anyhow::{Context, Result};
use fnirsi_lib::device::{self, DeviceIdentity};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).with_writer(std::io::stderr).init();

    info!("Listing connected USB devices...");

    let mut count = 0;
    let mut supported = 0;
    for device_info in nusb::list_devices().context("Failed to list USB devices")? {
        count += 1;
        let identity = DeviceIdentity::new(device_info.vendor_id(), device_info.product_id());
        let model = device::lookup(identity).ok().map(|d| d.model);

        info!(
            "Device #{}: {} Bus: {:03}, Address: {:03}{}",
            count,
            identity,
            device_info.bus_number(),
            device_info.device_address(),
            match model {
                Some(model) => format!("  [supported: {model}]"),
                None => String::new(),
            }
        );
        if model.is_some() {
            supported += 1;
        }
        info!("  Manufacturer: {}", device_info.manufacturer_string().unwrap_or("<Not available>"));
        info!("  Product: {}", device_info.product_string().unwrap_or("<Not available>"));
        info!("  Serial: {}", device_info.serial_number().unwrap_or("<Not available>"));
        info!("  Speed: {:?}", device_info.speed());
    }

    if count == 0 {
        info!("No USB devices found.");
    } else {
        info!("{} device(s), {} supported meter(s)", count, supported);
    }
    Ok(())
}
