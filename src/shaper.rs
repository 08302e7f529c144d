use crate::priv_prelude::*;

/// `Sink`/`Stream` adapter which passes packets sent through the `Sink` across one
/// [`TraceLink`](crate::TraceLink) and packets received from the `Stream` across another. Can be
/// created via [`SinkStreamExt::with_trace_links`](crate::SinkStreamExt::with_trace_links).
///
/// Packets a link refuses to admit (because they're larger than
/// [`MAX_OPPORTUNITY_BYTES`](crate::MAX_OPPORTUNITY_BYTES)) are dropped.
#[pin_project]
pub struct Shaped<S> {
    stream_finished: bool,
    #[pin]
    stream: S,
    #[pin]
    ingress: LinkDriver,
    #[pin]
    egress: LinkDriver,
}

#[pin_project]
struct LinkDriver {
    link: TraceLink,
    #[pin]
    sleep_opt: Option<Sleep>,
}

impl LinkDriver {
    fn new(link: TraceLink) -> LinkDriver {
        LinkDriver {
            link,
            sleep_opt: None,
        }
    }

    fn push(self: Pin<&mut Self>, packet: Bytes) {
        let this = self.project();
        if let Err(err) = this.link.read_packet(packet) {
            warn!("{}: dropping packet: {}", this.link.name(), err);
        }
    }

    /// Whether every admitted packet has been delivered and handed out, or never will be.
    fn is_drained(&self) -> bool {
        self.link.finished() || !(self.link.has_backlog() || self.link.pending_output())
    }

    fn pop(self: Pin<&mut Self>, cx: &mut task::Context) -> Poll<Bytes> {
        let mut this = self.project();
        loop {
            if let Some(packet) = this.link.pop_output() {
                return Poll::Ready(packet);
            }
            let wait_opt = this.link.wait_time();
            if this.link.pending_output() {
                continue;
            }
            if wait_opt.is_none() {
                return Poll::Pending;
            }
            if !this.link.has_backlog() {
                this.sleep_opt.set(None);
                return Poll::Pending;
            }
            let next_delivery_time = match this.link.next_delivery_time() {
                Some(next_delivery_time) => next_delivery_time,
                None => return Poll::Pending,
            };
            let deadline = this.link.clock().instant_at(next_delivery_time);
            match this.sleep_opt.as_mut().as_pin_mut() {
                Some(sleep) => sleep.reset(deadline),
                None => this.sleep_opt.set(Some(tokio::time::sleep_until(deadline))),
            }
            let sleep = match this.sleep_opt.as_mut().as_pin_mut() {
                Some(sleep) => sleep,
                None => return Poll::Pending,
            };
            match sleep.poll(cx) {
                Poll::Ready(()) => continue,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<S> Shaped<S>
where
    S: Stream<Item = Bytes> + Sink<Bytes>,
{
    /// Creates a new [`Shaped`]. See the documentation for
    /// [`SinkStreamExt::with_trace_links`](crate::SinkStreamExt::with_trace_links).
    pub fn new(stream: S, uplink: TraceLink, downlink: TraceLink) -> Shaped<S> {
        Shaped {
            stream_finished: false,
            stream,
            ingress: LinkDriver::new(downlink),
            egress: LinkDriver::new(uplink),
        }
    }

    /// The link that packets sent through the `Sink` cross.
    pub fn uplink(&self) -> &TraceLink {
        &self.egress.link
    }

    /// The link that packets received from the `Stream` cross.
    pub fn downlink(&self) -> &TraceLink {
        &self.ingress.link
    }
}

impl<S> Stream for Shaped<S>
where
    S: Stream<Item = Bytes> + Sink<Bytes>,
{
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut task::Context) -> Poll<Option<Bytes>> {
        let mut this = self.project();
        if !*this.stream_finished {
            loop {
                match this.stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(packet)) => this.ingress.as_mut().push(packet),
                    Poll::Ready(None) => {
                        *this.stream_finished = true;
                        break;
                    },
                    Poll::Pending => break,
                }
            }
        }
        match this.ingress.as_mut().pop(cx) {
            Poll::Ready(packet) => Poll::Ready(Some(packet)),
            Poll::Pending => {
                if *this.stream_finished && this.ingress.is_drained() {
                    Poll::Ready(None)
                } else {
                    Poll::Pending
                }
            },
        }
    }
}

impl<S> Sink<Bytes> for Shaped<S>
where
    S: Stream<Item = Bytes> + Sink<Bytes>,
{
    type Error = <S as Sink<Bytes>>::Error;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut task::Context) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, packet: Bytes) -> Result<(), Self::Error> {
        let this = self.project();
        this.egress.push(packet);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        let mut this = self.project();
        loop {
            ready!(this.stream.as_mut().poll_ready(cx))?;
            match this.egress.as_mut().pop(cx) {
                Poll::Ready(packet) => {
                    this.stream.as_mut().start_send(packet)?;
                },
                Poll::Pending => {
                    if this.egress.is_drained() {
                        return this.stream.poll_flush(cx);
                    }
                    let _ = this.stream.as_mut().poll_flush(cx)?;
                    return Poll::Pending;
                },
            }
        }
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        ready!(self.as_mut().poll_flush(cx))?;
        let this = self.project();
        this.stream.poll_close(cx)
    }
}
