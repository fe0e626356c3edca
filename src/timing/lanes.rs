use crate::ChicaneError;

/// Map a physical sensor to the logical lane it times.
///
/// Sensor 2 sits on the start/finish gate and always times logical lane 1.
/// Sensors 1 and 3 cover the outer lanes and swap meaning when the track is
/// laid out to run in the reverse direction.
pub fn lane_for_sensor(sensor: u8, reversed: bool) -> Result<usize, ChicaneError> {
    match sensor {
        1 => Ok(if reversed { 2 } else { 0 }),
        2 => Ok(1),
        3 => Ok(if reversed { 0 } else { 2 }),
        _ => Err(ChicaneError::InvalidLane { sensor }),
    }
}
