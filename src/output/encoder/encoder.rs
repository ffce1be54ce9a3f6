use crate::error::Result;
use crate::model::{AlarmEvent, DataPoint, Series};

pub enum Encodable<'a> {
    Series {
        series: &'a Series,
        points: &'a [DataPoint],
    },
    Alarm(&'a AlarmEvent),
}

pub trait Encoder {
    fn encode(&self, value: &Encodable) -> Result<Vec<u8>>;
}
