use crate::priv_prelude::*;

/// Extension trait for types which are both `Sink`s and `Stream`s of packets.
pub trait SinkStreamExt: Stream<Item = Bytes> + Sink<Bytes> {
    /// Shapes packets sent/received through this `Sink`/`Stream` to the capacity of two
    /// trace-driven links.
    ///
    /// * `uplink` carries packets sent through the `Sink`.
    /// * `downlink` carries packets received from the `Stream`.
    fn with_trace_links(self, uplink: TraceLink, downlink: TraceLink) -> crate::Shaped<Self>
    where
        Self: Sized,
    {
        crate::Shaped::new(self, uplink, downlink)
    }
}

impl<S> SinkStreamExt for S
where
    S: Stream<Item = Bytes> + Sink<Bytes>,
{
}
