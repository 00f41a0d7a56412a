use std::{error::Error, sync::Arc};

use wrapp_inject::{
    Arguments, AsyncInject, AsyncResolver, DependencyInfo, DynError, Inject, Producer, Registry,
    Resolver, Scope,
};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut registry = Registry::new();
    registry
        .local("driver_name", Producer::factory(|| "Fernando".to_string()))?
        .bind_self_async::<Garage>(Scope::Singleton);
    registry.validate()?;
    let registry = Arc::new(registry);

    let car = Resolver::new(registry.clone()).resolve::<Car>()?;
    println!("{} drives the car", car.driver.name);

    let resolver = AsyncResolver::new(registry);
    let garage = futures::executor::block_on(resolver.resolve_async::<Garage>())?;
    println!("{} parked in the garage", garage.car.driver.name);
    Ok(())
}

struct Driver {
    name: Arc<String>,
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

struct Car {
    driver: Arc<Driver>,
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

struct Garage {
    car: Arc<Car>,
}
impl AsyncInject for Garage {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::of::<Car>("car")]
    }

    async fn construct(args: Arguments) -> Result<Self, DynError> {
        Ok(Garage {
            car: args.get("car")?,
        })
    }
}
