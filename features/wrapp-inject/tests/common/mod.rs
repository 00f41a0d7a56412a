#![allow(dead_code)]

use std::sync::Arc;

use wrapp_inject::{Arguments, DependencyInfo, DynError, Inject};

pub struct Clock;
impl Inject for Clock {
    fn construct(_: &mut Arguments) -> Result<Self, DynError> {
        Ok(Clock)
    }
}

/// Asks for the same type twice
pub struct Widget {
    pub first: Arc<Clock>,
    pub second: Arc<Clock>,
}
impl Inject for Widget {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![
            DependencyInfo::of::<Clock>("first"),
            DependencyInfo::of::<Clock>("second"),
        ]
    }

    fn construct(args: &mut Arguments) -> Result<Self, DynError> {
        Ok(Widget {
            first: args.get("first")?,
            second: args.get("second")?,
        })
    }
}

pub struct Dashboard {
    pub widget: Arc<Widget>,
    pub clock: Arc<Clock>,
}
impl Inject for Dashboard {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![
            DependencyInfo::of::<Widget>("widget"),
            DependencyInfo::of::<Clock>("clock"),
        ]
    }

    fn construct(args: &mut Arguments) -> Result<Self, DynError> {
        Ok(Dashboard {
            widget: args.get("widget")?,
            clock: args.get("clock")?,
        })
    }
}

/// Also asks for a [Clock], to compare against [Dashboard]
pub struct Alarm {
    pub clock: Arc<Clock>,
}
impl Inject for Alarm {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::of::<Clock>("clock")]
    }

    fn construct(args: &mut Arguments) -> Result<Self, DynError> {
        Ok(Alarm {
            clock: args.get("clock")?,
        })
    }
}

pub struct Driver {
    pub name: Arc<String>,
}
impl Inject for Driver {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::typed::<String>("driver_name")]
    }

    fn construct(args: &mut Arguments) -> Result<Self, DynError> {
        Ok(Driver {
            name: args.get("driver_name")?,
        })
    }
}

pub struct Car {
    pub driver: Arc<Driver>,
}
impl Inject for Car {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::of::<Driver>("driver")]
    }

    fn construct(args: &mut Arguments) -> Result<Self, DynError> {
        Ok(Car {
            driver: args.get("driver")?,
        })
    }
}
