//! One acquisition pass: trigger, wait, read everything, build the frame.
//!
//! Order on the bus is fixed: light sensor into continuous high resolution,
//! conversion wait, stuck-bus check, the four UV registers, the light
//! value. The analog channels follow. A step that fails is recorded in the
//! cycle report and its field is framed as zero; nothing aborts the pass.

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::app::ports::{AnalogPort, NodePorts};
use crate::config::MIN_LIGHT_CONVERSION_MS;
use crate::fsm::context::{CycleContext, FaultSource, Readings};
use crate::sensors::bh1750::Mode;
use crate::telemetry::FrameFields;

/// Read every sensor, then overwrite `ctx.frame` with a checksummed frame
/// carrying the current message counter.
pub fn acquire<P: NodePorts>(ctx: &mut CycleContext, ports: &mut P) -> Readings {
    let sensors = ctx.sensors;
    let mut readings = Readings::default();

    if let Err(e) = sensors.light.set_mode(ports.bus(), Mode::ContinuousHigh) {
        ctx.record_fault(FaultSource::LightMode, e);
    }
    ports
        .delay()
        .delay_ms(ctx.config.light_conversion_ms.max(MIN_LIGHT_CONVERSION_MS));

    let uv = sensors.uv.read(ports.bus());
    ctx.note_recovery(uv.recovery);
    for (channel, e) in uv.faults {
        ctx.record_fault(FaultSource::Uv(channel), e);
    }
    readings.uv = uv.reading;

    match sensors.light.read_value(ports.bus()) {
        Ok(v) => readings.visible = v,
        Err(e) => ctx.record_fault(FaultSource::Light, e),
    }

    match ports.analog().read_battery() {
        Ok(v) => readings.battery = v,
        Err(e) => ctx.record_fault(FaultSource::Battery, e),
    }
    match ports.analog().read_temperature() {
        Ok(v) => readings.temperature = v,
        Err(e) => ctx.record_fault(FaultSource::Temperature, e),
    }

    debug!(
        "UVA {} UVB {} COMP1 {} COMP2 {} VIS {} BATT {} TEMP {}",
        readings.uv.uva,
        readings.uv.uvb,
        readings.uv.comp1,
        readings.uv.comp2,
        readings.visible,
        readings.battery,
        readings.temperature
    );

    let fields = frame_fields(ctx, &readings);
    ctx.frame.encode(&fields, ports.checksum());
    ctx.report.readings = readings;
    readings
}

fn frame_fields(ctx: &CycleContext, readings: &Readings) -> FrameFields {
    FrameFields {
        node_type: ctx.config.node_type,
        address: ctx.config.node_address,
        version: ctx.config.software_version,
        counter: ctx.counter,
        battery: readings.battery,
        temperature: readings.temperature,
        uva: readings.uv.uva,
        uvb: readings.uv.uvb,
        comp1: readings.uv.comp1,
        comp2: readings.uv.comp2,
        visible: readings.visible,
    }
}
