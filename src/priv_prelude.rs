#![allow(unused_imports)]

pub(crate) use {
    crate::*,
    std::{
        cmp, fmt, io, mem, thread,
        collections::{BTreeMap, VecDeque},
        fs::{File, OpenOptions},
        future::Future,
        io::{BufRead, BufReader, LineWriter, Read, Write},
        path::{Path, PathBuf},
        pin::Pin,
        str::FromStr,
        sync::{Arc, Mutex, OnceLock},
        task::{self, Poll},
        time::{Duration, SystemTime, UNIX_EPOCH},
    },
    bytes::Bytes,
    futures::{
        channel::mpsc,
        join, ready,
        Sink, SinkExt, Stream, StreamExt,
    },
    log::{debug, info, trace, warn},
    pin_project::pin_project,
    thiserror::Error,
    tokio::time::{Instant, Sleep},
};
