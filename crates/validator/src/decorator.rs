/// Wraps a value of type `In` into an `Out`, e.g. a handler into a validated handler.
pub trait Decorator<In> {
    type Out;

    fn decorate(&self, raw: In) -> Self::Out;
}
