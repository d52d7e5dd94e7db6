//! GPIO-backed encoder input and reset button watcher (Raspberry Pi, rppal).

use crate::error::HwError;
use rode_traits::{EncoderInput, PhaseSample};
use rppal::gpio::{Gpio, InputPin, Level};
use std::time::Duration;

/// Two pulled-up input pins carrying the quadrature phase lines.
pub struct GpioEncoder {
    phase_a: InputPin,
    phase_b: InputPin,
}

impl GpioEncoder {
    pub fn new(pin_a: u8, pin_b: u8) -> Result<Self, HwError> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        let phase_a = gpio
            .get(pin_a)
            .map_err(|e| HwError::Gpio(format!("phase A pin {pin_a}: {e}")))?
            .into_input_pullup();
        let phase_b = gpio
            .get(pin_b)
            .map_err(|e| HwError::Gpio(format!("phase B pin {pin_b}: {e}")))?
            .into_input_pullup();
        Ok(Self { phase_a, phase_b })
    }
}

impl EncoderInput for GpioEncoder {
    fn sample(&mut self) -> Result<PhaseSample, Box<dyn std::error::Error + Send + Sync>> {
        Ok(PhaseSample {
            a: self.phase_a.read() == Level::High,
            b: self.phase_b.read() == Level::High,
        })
    }
}

/// Spawn a thread polling the reset button and firing `on_falling` on each
/// high-to-low edge. The closure must be cheap and non-blocking; it runs in
/// the watcher thread, not the tick loop.
pub fn spawn_reset_watcher<F>(pin: u8, poll_ms: u64, on_falling: F) -> Result<(), HwError>
where
    F: Fn() + Send + 'static,
{
    let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
    let button = gpio
        .get(pin)
        .map_err(|e| HwError::Gpio(format!("reset pin {pin}: {e}")))?
        .into_input_pullup();
    std::thread::spawn(move || {
        let mut last = button.read();
        loop {
            let now = button.read();
            if last == Level::High && now == Level::Low {
                tracing::info!(pin, "reset button pressed");
                on_falling();
            }
            last = now;
            std::thread::sleep(Duration::from_millis(poll_ms.max(1)));
        }
    });
    Ok(())
}
