mod test_injector;
